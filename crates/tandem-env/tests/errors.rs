//! Integration test: failures surface unchanged and are never retried.

use serde_json::json;
use tandem_core::{Config, ConfigError, Device, TensorError};
use tandem_engine::EngineError;
use tandem_env::{EnvError, SimEnv};
use tandem_test_utils::CounterTask;

fn config(value: serde_json::Value) -> Config {
    Config::from_value(value).unwrap()
}

#[test]
fn missing_episode_length_fails_construction() {
    let cfg = config(json!({ "env": {}, "engine": {} }));
    let err = SimEnv::new(CounterTask::new(), &cfg, 2, Device::Cpu, false).unwrap_err();
    assert_eq!(
        err,
        EnvError::Config(ConfigError::MissingKey {
            key: "env.episode_length".into()
        })
    );
}

#[test]
fn missing_engine_section_fails_construction() {
    let cfg = config(json!({ "env": { "episode_length": 1.0 } }));
    let err = SimEnv::new(CounterTask::new(), &cfg, 2, Device::Cpu, false).unwrap_err();
    assert_eq!(
        err,
        EnvError::Config(ConfigError::MissingKey {
            key: "engine".into()
        })
    );
}

#[test]
fn invalid_engine_setting_is_a_config_error() {
    let cfg = config(json!({
        "env": { "episode_length": 1.0 },
        "engine": { "timestep": "fast" }
    }));
    let err = SimEnv::new(CounterTask::new(), &cfg, 2, Device::Cpu, false).unwrap_err();
    assert!(matches!(
        err,
        EnvError::Engine(EngineError::Config(ConfigError::InvalidValue { .. }))
    ));
}

#[test]
fn task_without_camera_cannot_visualize() {
    let cfg = config(json!({ "env": { "episode_length": 1.0 }, "engine": {} }));
    let err = SimEnv::new(CounterTask::new(), &cfg, 2, Device::Cpu, true).unwrap_err();
    assert_eq!(
        err,
        EnvError::NotImplemented {
            hook: "init_camera"
        }
    );
    assert_eq!(err.to_string(), "task does not implement 'init_camera'");
}

#[test]
fn engine_step_failure_propagates_unchanged() {
    let cfg = config(json!({
        "env": { "episode_length": 1.0 },
        "engine": { "fail_on_step": 3 }
    }));
    let mut env = SimEnv::new(CounterTask::new(), &cfg, 2, Device::Cpu, false).unwrap();
    env.reset(None).unwrap();
    env.step(&[1.0, 1.0]).unwrap();
    env.step(&[1.0, 1.0]).unwrap();
    let err = env.step(&[1.0, 1.0]).unwrap_err();
    assert_eq!(
        err,
        EnvError::Engine(EngineError::Backend {
            reason: "injected failure on step 3".into()
        })
    );
    assert!(std::error::Error::source(&err).is_some());
    // Nothing past the failing call ran, and nothing was retried.
    assert_eq!(env.engine().calls().step, 3);
    assert_eq!(env.timesteps(), &[2, 2]);
}

#[test]
fn observation_shape_drift_is_detected_on_write() {
    // Probe plus the first reset are well-formed; the first step widens.
    let task = CounterTask::new().widen_obs_after(2);
    let cfg = config(json!({ "env": { "episode_length": 1.0 }, "engine": {} }));
    let mut env = SimEnv::new(task, &cfg, 2, Device::Cpu, false).unwrap();
    env.reset(None).unwrap();
    let err = env.step(&[0.0, 0.0]).unwrap_err();
    assert_eq!(
        err,
        EnvError::Tensor(TensorError::ShapeMismatch {
            expected: vec![2, 3],
            actual: vec![2, 4],
        })
    );
}

#[test]
fn wrong_action_length_is_rejected_before_stepping() {
    let cfg = config(json!({ "env": { "episode_length": 1.0 }, "engine": {} }));
    let mut env = SimEnv::new(CounterTask::new(), &cfg, 3, Device::Cpu, false).unwrap();
    env.reset(None).unwrap();
    assert!(matches!(
        env.step(&[1.0]),
        Err(EnvError::InvalidAction { .. })
    ));
    assert_eq!(env.engine().calls().step, 0);
}
