//! End-to-end batched RL loop example.
//!
//! Demonstrates: config → SimEnv<PointReach> → reset → step with sampled
//! actions → collect finished envs → partial reset → repeat → close.
//!
//! Construction and engine logs go through `tracing`; set `RUST_LOG=debug`
//! (or `trace` for per-phase step logs) to see them.

use tandem_bench::{reference_config, ActionSampler};
use tandem_core::{Device, InfoValue};
use tandem_env::SimEnv;
use tandem_envs::point_reach::{FAIL, SUCC, TIME};
use tandem_envs::PointReach;
use tracing_subscriber::EnvFilter;

const NUM_ENVS: usize = 64;
const STEPS: usize = 600;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Tandem PointReach Rollout ===\n");

    let config = reference_config(7).unwrap();
    let mut env = SimEnv::new(PointReach::new(), &config, NUM_ENVS, Device::Cpu, false).unwrap();
    println!(
        "obs space {:?} ({}), action space {:?}",
        env.obs_space().shape(),
        env.obs_space().dtype(),
        env.action_space().shape(),
    );

    let mut sampler = ActionSampler::new(env.action_space().as_box().unwrap().clone(), 7);
    env.reset(None).unwrap();

    let (mut succ, mut fail, mut time) = (0usize, 0usize, 0usize);
    let mut total_reward = 0.0f64;

    for step in 0..STEPS {
        let action = sampler.sample(NUM_ENVS).unwrap();
        let out = env.step(&action).unwrap();
        total_reward += out.reward.iter().map(|r| f64::from(*r)).sum::<f64>();

        for code in out.done {
            match *code {
                c if c == SUCC => succ += 1,
                c if c == FAIL => fail += 1,
                c if c == TIME => time += 1,
                _ => {}
            }
        }

        if step % 100 == 0 || step == STEPS - 1 {
            let mean_dist = match env.info().get("dist") {
                Some(InfoValue::PerEnv(d)) => d.iter().sum::<f32>() / d.len() as f32,
                _ => f32::NAN,
            };
            println!(
                "  step {:>3}: mean_reward={:>7.4}, mean_dist={:>6.3}, done={:>2}",
                step + 1,
                total_reward / ((step + 1) * NUM_ENVS) as f64,
                mean_dist,
                env.done_env_ids().len(),
            );
        }

        let finished = env.done_env_ids();
        env.reset(Some(&finished)).unwrap();
    }

    println!("\nEpisodes: {succ} reached, {fail} lost, {time} timed out");
    env.close().unwrap();
    println!("Done.");
}
