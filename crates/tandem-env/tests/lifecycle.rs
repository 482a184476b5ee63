//! Integration test: reset/step lifecycle of a batched environment.
//!
//! Drives a `CounterTask` on the mock engine through full and partial
//! resets and checks buffer sizes, time accounting, reset isolation,
//! the absence of auto-reset, and when rendering happens.

use proptest::prelude::*;
use serde_json::json;
use tandem_core::{Config, DType, Device, DoneCode, InfoValue, SpaceDtype};
use tandem_engine::Engine;
use tandem_env::{EnvState, SimEnv};
use tandem_test_utils::fixtures::COUNTER_DONE;
use tandem_test_utils::CounterTask;

fn config(episode_length: f64, engine: serde_json::Value) -> Config {
    Config::from_value(json!({
        "env": { "episode_length": episode_length },
        "engine": engine,
    }))
    .unwrap()
}

fn counter_env(n: usize, visualize: bool, engine: serde_json::Value) -> SimEnv<CounterTask> {
    let task = CounterTask::new().with_camera();
    SimEnv::new(task, &config(2.0, engine), n, Device::Cpu, visualize).unwrap()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
    }
}

// ── Scenario ────────────────────────────────────────────────────────

#[test]
fn four_envs_twenty_steps_then_partial_reset() {
    let mut env = counter_env(4, false, json!({ "timestep": 0.1 }));

    env.reset(None).unwrap();
    assert_eq!(env.env_time(None).unwrap(), vec![0.0; 4]);

    let action = [1.0f32; 4];
    for _ in 0..20 {
        env.step(&action).unwrap();
    }
    assert_eq!(env.timesteps(), &[20, 20, 20, 20]);
    assert_close(&env.env_time(None).unwrap(), &[2.0, 2.0, 2.0, 2.0]);
    assert!(env.done().iter().all(|d| *d == COUNTER_DONE));

    env.reset(Some(&[1])).unwrap();
    assert_close(&env.env_time(None).unwrap(), &[2.0, 0.0, 2.0, 2.0]);
    assert_eq!(env.timesteps(), &[20, 0, 20, 20]);
    assert_eq!(env.done_env_ids(), vec![0, 2, 3]);
    assert_eq!(env.state(), EnvState::Reset);
}

#[test]
fn buffers_are_sized_by_batch() {
    for n in [1, 3, 16] {
        let env = counter_env(n, false, json!({}));
        assert_eq!(env.num_envs(), n);
        assert_eq!(env.obs().shape()[0], n);
        assert_eq!(env.rewards().len(), n);
        assert_eq!(env.done().len(), n);
        assert_eq!(env.timesteps().len(), n);
        assert_eq!(env.env_time(None).unwrap().len(), n);
    }
}

#[test]
fn batch_size_comes_from_the_engine() {
    // Ask for two, the engine provisions three.
    let mut env = counter_env(2, false, json!({ "extra_envs": 1 }));
    assert_eq!(env.engine().num_envs(), 3);
    assert_eq!(env.num_envs(), 3);
    assert_eq!(env.obs().shape(), &[3, 3]);
    assert_eq!(env.rewards().len(), 3);
    assert_eq!(env.timesteps().len(), 3);

    let (obs, _) = env.reset(None).unwrap();
    assert_eq!(obs.shape(), &[3, 3]);
    env.step(&[1.0, 1.0, 1.0]).unwrap();
    assert_eq!(env.timesteps(), &[1, 1, 1]);
    env.reset(Some(&[2])).unwrap();
    assert_eq!(env.timesteps(), &[1, 1, 0]);
}

#[test]
fn full_reset_zeroes_time() {
    let mut env = counter_env(3, false, json!({}));
    env.reset(None).unwrap();
    for _ in 0..5 {
        env.step(&[0.0; 3]).unwrap();
    }
    env.reset(None).unwrap();
    assert_eq!(env.env_time(None).unwrap(), vec![0.0; 3]);
    assert_eq!(env.timesteps(), &[0; 3]);
    assert!(env.done().iter().all(|d| *d == DoneCode::NULL));
}

#[test]
fn finished_envs_are_not_auto_reset() {
    let mut env = SimEnv::new(
        CounterTask::new(),
        &config(0.3, json!({ "timestep": 0.1 })),
        2,
        Device::Cpu,
        false,
    )
    .unwrap();
    env.reset(None).unwrap();
    for _ in 0..3 {
        env.step(&[1.0, 2.0]).unwrap();
    }
    assert_eq!(env.done_env_ids(), vec![0, 1]);

    // Stepping further keeps counting; nothing resets on its own.
    let out = env.step(&[1.0, 2.0]).unwrap();
    assert_eq!(out.done, &[COUNTER_DONE, COUNTER_DONE]);
    let obs = out.obs.as_f32().unwrap().to_vec();
    assert!((obs[0] - 0.4).abs() < 1e-5);
    assert!((obs[3] - 0.8).abs() < 1e-5);
    assert_eq!(env.timesteps(), &[4, 4]);
}

#[test]
fn partial_reset_refreshes_only_listed_rows() {
    let mut env = counter_env(3, false, json!({ "timestep": 0.5 }));
    env.reset(None).unwrap();
    env.step(&[1.0, 1.0, 1.0]).unwrap();
    let before = env.obs().clone();

    let (obs, info) = env.reset(Some(&[2])).unwrap();
    let rows = obs.as_f32().unwrap();
    assert_eq!(&rows[..6], &before.as_f32().unwrap()[..6]);
    assert_eq!(rows[6], 0.0);
    assert_eq!(info.get("resets").and_then(InfoValue::as_count), Some(4));
}

#[test]
fn step_output_borrows_current_buffers() {
    let mut env = counter_env(2, false, json!({}));
    env.reset(None).unwrap();
    let out = env.step(&[0.5, 0.5]).unwrap();
    assert_eq!(out.reward, &[1.0, 1.0]);
    assert_eq!(out.obs.shape(), &[2, 3]);
    assert!(out.info.contains_key("value"));
}

#[test]
fn obs_space_follows_probe_dtype() {
    let task = CounterTask::new().with_obs_dtype(DType::I64);
    let env = SimEnv::new(task, &config(1.0, json!({})), 2, Device::Cpu, false).unwrap();
    assert_eq!(env.obs_space().shape(), &[3]);
    assert_eq!(env.obs_space().dtype(), SpaceDtype::Int64);
    assert_eq!(env.obs().dtype(), DType::I64);
}

#[test]
fn obs_space_probe_is_idempotent() {
    let mut env = counter_env(4, false, json!({}));
    env.reset(None).unwrap();
    env.step(&[1.0; 4]).unwrap();
    let a = env.get_obs_space().unwrap();
    let b = env.get_obs_space().unwrap();
    assert_eq!(a.shape(), b.shape());
    assert_eq!(a.dtype(), b.dtype());
    assert_eq!(env.engine().calls().step, 1);
}

// ── Rendering ───────────────────────────────────────────────────────

#[test]
fn headless_without_recording_never_renders() {
    let mut env = counter_env(2, false, json!({}));
    env.reset(None).unwrap();
    for _ in 0..5 {
        env.step(&[0.0, 0.0]).unwrap();
    }
    assert_eq!(env.engine().calls().render, 0);
    assert_eq!(env.engine().calls().camera, 0);
}

#[test]
fn visualize_renders_every_step_with_camera_update() {
    let mut env = counter_env(2, true, json!({}));
    env.reset(None).unwrap();
    for _ in 0..5 {
        env.step(&[1.0, 0.0]).unwrap();
    }
    let calls = env.engine().calls();
    assert_eq!(calls.render, 5);
    // One pose at init, one per render.
    assert_eq!(calls.camera, 6);
    let (position, _) = env.engine().camera().unwrap();
    assert!((position[0] - 0.5).abs() < 1e-5);
}

#[test]
fn video_recording_renders_without_viewer() {
    let mut env = counter_env(2, false, json!({ "record_video": true }));
    env.reset(None).unwrap();
    for _ in 0..3 {
        env.step(&[0.0, 0.0]).unwrap();
    }
    assert_eq!(env.engine().calls().render, 3);
}

// ── Hook ordering ───────────────────────────────────────────────────

#[test]
fn full_cycle_hook_order() {
    let mut env = counter_env(1, true, json!({}));
    let construction = env.engine().take_trace();
    assert_eq!(
        construction,
        vec![
            "build",
            "build_envs",
            "initialize_sim",
            "build_action_space",
            "build_sim_tensors",
            "compute_obs",
            "init_camera",
            "set_camera_pose",
        ]
    );

    env.reset(None).unwrap();
    assert_eq!(
        env.engine().take_trace(),
        vec!["reset_envs", "update_sim_state", "compute_obs", "update_info"]
    );

    env.step(&[0.0]).unwrap();
    assert_eq!(
        env.engine().take_trace(),
        vec![
            "apply_action",
            "step",
            "update_camera",
            "set_camera_pose",
            "render",
            "update_misc",
            "compute_obs",
            "update_info",
            "update_reward",
            "update_done",
        ]
    );
}

#[test]
fn close_reaches_engine() {
    let env = counter_env(2, false, json!({}));
    let log = env.engine().calls_handle();
    env.close().unwrap();
    assert_eq!(log.snapshot().close, 1);
    assert_eq!(log.take_trace().last(), Some(&"close"));
}

// ── Properties ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn partial_reset_leaves_other_envs_bit_identical(
        n in 2usize..12,
        steps in 1usize..8,
        subset in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let mut env = counter_env(n, false, json!({ "timestep": 0.3 }));
        env.reset(None).unwrap();
        let action = vec![1.0f32; n];
        for _ in 0..steps {
            env.step(&action).unwrap();
        }
        let ids: Vec<usize> = (0..n).filter(|&i| subset[i]).collect();
        let done = env.done().to_vec();
        let timesteps = env.timesteps().to_vec();
        let time = env.env_time(None).unwrap();

        env.reset(Some(&ids)).unwrap();

        for i in (0..n).filter(|i| !ids.contains(i)) {
            prop_assert_eq!(env.done()[i], done[i]);
            prop_assert_eq!(env.timesteps()[i], timesteps[i]);
            prop_assert_eq!(env.buffers().time()[i].to_bits(), time[i].to_bits());
        }
        for &i in &ids {
            prop_assert_eq!(env.timesteps()[i], 0);
            prop_assert_eq!(env.buffers().time()[i], 0.0);
            prop_assert_eq!(env.done()[i], DoneCode::NULL);
        }
    }
}
