use q4dot::config::{parse_sizes, BenchConfig, ConfigError, DEFAULT_SWEEP_SIZES};

// Only this test touches the environment, which is process-wide.
#[test]
fn env_overrides_and_validation() {
    let d = BenchConfig::default();
    assert_eq!(d.n, 4096);
    assert_eq!(d.iterations, 100_000);
    assert_eq!(d.sweep_sizes, DEFAULT_SWEEP_SIZES.to_vec());
    assert!(d.validate().is_ok());

    std::env::set_var("Q4DOT_N", "1024");
    std::env::set_var("Q4DOT_ITERATIONS", "50");
    std::env::set_var("Q4DOT_SEED", "7");
    std::env::set_var("Q4DOT_SIZES", "32, 64,128");
    let c = BenchConfig::from_env().unwrap();
    assert_eq!(c.n, 1024);
    assert_eq!(c.iterations, 50);
    assert_eq!(c.sweep_iterations, 50);
    assert_eq!(c.seed, 7);
    assert!(c.random);
    assert_eq!(c.sweep_sizes, vec![32, 64, 128]);

    std::env::set_var("Q4DOT_WARMUP", "lots");
    assert_eq!(
        BenchConfig::from_env().unwrap_err(),
        ConfigError::BadEnv { var: "Q4DOT_WARMUP", value: "lots".into() }
    );
    for v in ["Q4DOT_N", "Q4DOT_ITERATIONS", "Q4DOT_SEED", "Q4DOT_SIZES", "Q4DOT_WARMUP"] {
        std::env::remove_var(v);
    }

    let bad = BenchConfig { iterations: 0, ..BenchConfig::default() };
    assert_eq!(bad.validate(), Err(ConfigError::Zero("iterations")));
    let bad = BenchConfig { sweep_sizes: vec![], ..BenchConfig::default() };
    assert_eq!(bad.validate(), Err(ConfigError::EmptySweep));

    assert_eq!(parse_sizes("1,2,x"), None);
}

#[test]
fn tolerance_must_be_finite_and_non_negative() {
    assert!(BenchConfig { tolerance: 0.0, ..BenchConfig::default() }.validate().is_ok());
    let neg = BenchConfig { tolerance: -1e-5, ..BenchConfig::default() };
    assert_eq!(neg.validate(), Err(ConfigError::BadTolerance(-1e-5)));
    let nan = BenchConfig { tolerance: f64::NAN, ..BenchConfig::default() };
    assert!(matches!(nan.validate(), Err(ConfigError::BadTolerance(t)) if t.is_nan()));
    let inf = BenchConfig { tolerance: f64::INFINITY, ..BenchConfig::default() };
    assert!(inf.validate().is_err());
}
