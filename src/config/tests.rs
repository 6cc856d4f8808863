use super::*;
use tempfile::TempDir;

fn default_config(base_dir: &Path) -> Config {
    Config::load(base_dir).expect("defaults should load")
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("load should succeed");

    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.chunking.chunk_size, 800);
    assert_eq!(config.chunking.chunk_overlap, 160);
    assert_eq!(config.chunking.chunk_min, 600);
    assert_eq!(config.chunking.chunk_max, 1000);
    assert_eq!(config.retrieval.top_k, 8);
    assert_eq!(config.retrieval.per_query_k, 5);
    assert_eq!(config.generation.max_context_chars, 6000);
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = default_config(temp_dir.path());
    config.ollama.embedding_model = "custom-embed".to_string();
    config.chunking.chunk_size = 500;
    config.chunking.chunk_min = 300;
    config.chunking.chunk_overlap = 100;
    config.chunking.chunk_max = 700;
    config.retrieval.top_k = 12;
    config.save().expect("save should succeed");

    let loaded = Config::load(temp_dir.path()).expect("load should succeed");

    assert_eq!(loaded.ollama.embedding_model, "custom-embed");
    assert_eq!(loaded.chunking.chunk_size, 500);
    assert_eq!(loaded.retrieval.top_k, 12);
}

#[test]
fn default_configuration_validates() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = default_config(temp_dir.path());

    assert!(config.validate().is_ok());
}

#[test]
fn invalid_protocol_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = default_config(temp_dir.path());
    config.ollama.protocol = "ftp".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn zero_port_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = default_config(temp_dir.path());
    config.ollama.port = 0;

    assert!(matches!(config.validate(), Err(ConfigError::InvalidPort(0))));
}

#[test]
fn empty_model_names_are_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = default_config(temp_dir.path());
    config.ollama.embedding_model = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));

    let mut config = default_config(temp_dir.path());
    config.ollama.generation_model = String::new();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));
}

#[test]
fn out_of_range_batch_size_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = default_config(temp_dir.path());
    config.ollama.batch_size = 0;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBatchSize(0))
    ));
}

#[test]
fn out_of_range_embedding_dimension_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = default_config(temp_dir.path());
    config.ollama.embedding_dimension = 10_000;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidEmbeddingDimension(10_000))
    ));
}

#[test]
fn chunk_relationships_are_enforced() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    // max below size
    let mut config = default_config(temp_dir.path());
    config.chunking.chunk_max = 700;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ChunkMaxTooSmall(700, 800))
    ));

    // min not below size
    let mut config = default_config(temp_dir.path());
    config.chunking.chunk_min = 800;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ChunkMinTooLarge(800, 800))
    ));

    // overlap must stay below min so the window always advances
    let mut config = default_config(temp_dir.path());
    config.chunking.chunk_overlap = 650;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(650, 600))
    ));
}

#[test]
fn retrieval_bounds_are_enforced() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = default_config(temp_dir.path());
    config.retrieval.top_k = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidTopK(0))));

    let mut config = default_config(temp_dir.path());
    config.retrieval.per_query_k = 101;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidPerQueryK(101))
    ));

    let mut config = default_config(temp_dir.path());
    config.retrieval.queries_per_plan = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidQueryCount(0))
    ));
}

#[test]
fn generation_bounds_are_enforced() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = default_config(temp_dir.path());
    config.generation.max_context_chars = 100;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidContextBudget(100))
    ));

    let mut config = default_config(temp_dir.path());
    config.generation.mcq_count = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidMcqCount(0))
    ));
}

#[test]
fn invalid_file_content_fails_to_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "not [valid toml")
        .expect("should write file");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn index_path_lives_under_the_base_dir() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = default_config(temp_dir.path());

    assert_eq!(config.index_path(), temp_dir.path().join("vectors"));
}
