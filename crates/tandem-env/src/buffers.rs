//! Per-environment data buffers.
//!
//! [`EnvBuffers`] holds the five batch buffers and the info mapping. It is
//! allocated once, sized to the batch, and never resized. The public API
//! is read-only; every write goes through [`SimEnv`](crate::SimEnv) or the
//! [`EnvContext`](crate::EnvContext) it hands to task hooks, so the
//! environment is the single writer.

use tandem_core::{BoxSpace, Device, DoneCode, Info, Tensor};

use crate::error::EnvError;

/// Batch buffers owned by one environment.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvBuffers {
    device: Device,
    obs: Tensor,
    reward: Vec<f32>,
    done: Vec<DoneCode>,
    timestep: Vec<u64>,
    time: Vec<f64>,
    info: Info,
}

impl EnvBuffers {
    /// Allocate zero-initialized buffers for `num_envs` environments.
    ///
    /// The observation buffer has shape `[num_envs, *obs_space.shape()]`
    /// and the element type named by `obs_space.dtype()`. Done codes start
    /// at [`DoneCode::NULL`] and the info mapping starts empty.
    ///
    /// # Errors
    ///
    /// [`EnvError::ObsSpaceMissing`] if `obs_space` is `None`: the
    /// observation space has to be probed first.
    pub fn allocate(
        num_envs: usize,
        device: Device,
        obs_space: Option<&BoxSpace>,
    ) -> Result<Self, EnvError> {
        let obs_space = obs_space.ok_or(EnvError::ObsSpaceMissing)?;
        let mut obs_shape = Vec::with_capacity(obs_space.shape().len() + 1);
        obs_shape.push(num_envs);
        obs_shape.extend_from_slice(obs_space.shape());

        Ok(Self {
            device,
            obs: Tensor::zeros(&obs_shape, obs_space.dtype().to_dtype()),
            reward: vec![0.0; num_envs],
            done: vec![DoneCode::NULL; num_envs],
            timestep: vec![0; num_envs],
            time: vec![0.0; num_envs],
            info: Info::new(),
        })
    }

    /// Batch size.
    pub fn num_envs(&self) -> usize {
        self.reward.len()
    }

    /// Device recorded at allocation.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Observation buffer, `[N, *obs_shape]`.
    pub fn obs(&self) -> &Tensor {
        &self.obs
    }

    /// Reward buffer, `[N]`.
    pub fn rewards(&self) -> &[f32] {
        &self.reward
    }

    /// Done codes, `[N]`.
    pub fn done(&self) -> &[DoneCode] {
        &self.done
    }

    /// Steps since each environment's last reset, `[N]`.
    pub fn timesteps(&self) -> &[u64] {
        &self.timestep
    }

    /// Elapsed episode time in seconds, `[N]`.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Info mapping.
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Elapsed time for the whole batch (`None`) or the listed
    /// environments, in the order given.
    pub fn env_time(&self, env_ids: Option<&[usize]>) -> Result<Vec<f64>, EnvError> {
        match env_ids {
            None => Ok(self.time.clone()),
            Some(ids) => {
                self.check_ids(ids)?;
                Ok(ids.iter().map(|&i| self.time[i]).collect())
            }
        }
    }

    /// Reject any id outside `0..num_envs`.
    pub fn check_ids(&self, env_ids: &[usize]) -> Result<(), EnvError> {
        let num_envs = self.num_envs();
        match env_ids.iter().find(|&&i| i >= num_envs) {
            Some(&env_id) => Err(EnvError::InvalidEnvId { env_id, num_envs }),
            None => Ok(()),
        }
    }

    /// Zero the counters and clear the done codes of exactly `env_ids`.
    pub(crate) fn reset_envs(&mut self, env_ids: &[usize]) {
        for &i in env_ids {
            self.timestep[i] = 0;
            self.time[i] = 0.0;
            self.done[i] = DoneCode::NULL;
        }
    }

    /// Advance every counter by one step and recompute elapsed time.
    pub(crate) fn advance_time(&mut self, dt: f64) {
        for (t, time) in self.timestep.iter_mut().zip(self.time.iter_mut()) {
            *t += 1;
            *time = dt * *t as f64;
        }
    }

    /// Write freshly computed observations for the full batch (`None`) or
    /// the rows in `env_ids`.
    pub(crate) fn write_obs(&mut self, env_ids: Option<&[usize]>, obs: &Tensor) -> Result<(), EnvError> {
        match env_ids {
            None => self.obs.assign(obs)?,
            Some(ids) => self.obs.assign_rows(ids, obs)?,
        }
        Ok(())
    }

    pub(crate) fn rewards_mut(&mut self) -> &mut [f32] {
        &mut self.reward
    }

    pub(crate) fn done_mut(&mut self) -> &mut [DoneCode] {
        &mut self.done
    }

    pub(crate) fn info_mut(&mut self) -> &mut Info {
        &mut self.info
    }

    /// Split into the read-only and writable parts a hook sees at once.
    pub(crate) fn outputs(&mut self) -> Outputs<'_> {
        Outputs {
            obs: &self.obs,
            timesteps: &self.timestep,
            time: &self.time,
            rewards: &mut self.reward,
            done: &mut self.done,
            info: &mut self.info,
        }
    }
}

/// Simultaneous view of the buffers for a hook: observations and counters
/// read-only, rewards, done codes and info writable.
#[derive(Debug)]
pub struct Outputs<'a> {
    /// Observation buffer.
    pub obs: &'a Tensor,
    /// Steps since reset.
    pub timesteps: &'a [u64],
    /// Elapsed episode time.
    pub time: &'a [f64],
    /// Reward buffer.
    pub rewards: &'a mut [f32],
    /// Done codes.
    pub done: &'a mut [DoneCode],
    /// Info mapping.
    pub info: &'a mut Info,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tandem_core::{DType, SpaceDtype};

    fn obs_space() -> BoxSpace {
        BoxSpace::unbounded(&[3, 2], SpaceDtype::Float64)
    }

    fn buffers(n: usize) -> EnvBuffers {
        EnvBuffers::allocate(n, Device::Cpu, Some(&obs_space())).unwrap()
    }

    #[test]
    fn allocate_requires_obs_space() {
        assert_eq!(
            EnvBuffers::allocate(4, Device::Cpu, None),
            Err(EnvError::ObsSpaceMissing)
        );
    }

    #[test]
    fn allocate_shapes_everything_by_batch() {
        let b = buffers(5);
        assert_eq!(b.num_envs(), 5);
        assert_eq!(b.obs().shape(), &[5, 3, 2]);
        assert_eq!(b.obs().dtype(), DType::F64);
        assert_eq!(b.rewards(), &[0.0; 5]);
        assert!(b.done().iter().all(|d| *d == DoneCode::NULL));
        assert_eq!(b.timesteps(), &[0; 5]);
        assert_eq!(b.time(), &[0.0; 5]);
        assert!(b.info().is_empty());
    }

    #[test]
    fn advance_time_is_derived_from_counter() {
        let mut b = buffers(2);
        for _ in 0..20 {
            b.advance_time(0.1);
        }
        assert_eq!(b.timesteps(), &[20, 20]);
        for t in b.time() {
            assert!((t - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn env_time_gathers_in_order() {
        let mut b = buffers(3);
        b.advance_time(0.5);
        b.reset_envs(&[1]);
        assert_eq!(b.env_time(Some(&[2, 1])).unwrap(), vec![0.5, 0.0]);
        assert_eq!(b.env_time(None).unwrap(), vec![0.5, 0.0, 0.5]);
        assert_eq!(
            b.env_time(Some(&[3])),
            Err(EnvError::InvalidEnvId {
                env_id: 3,
                num_envs: 3
            })
        );
    }

    #[test]
    fn write_obs_checks_shape() {
        let mut b = buffers(2);
        let wrong = Tensor::zeros(&[2, 3, 3], DType::F64);
        assert!(matches!(
            b.write_obs(None, &wrong),
            Err(EnvError::Tensor(_))
        ));
        let wrong_dtype = Tensor::zeros(&[1, 3, 2], DType::F32);
        assert!(matches!(
            b.write_obs(Some(&[0]), &wrong_dtype),
            Err(EnvError::Tensor(_))
        ));
    }

    proptest! {
        #[test]
        fn reset_isolates_untouched_envs(
            n in 1usize..64,
            steps in 0u32..10,
            picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..16),
        ) {
            let mut b = buffers(n);
            for _ in 0..steps {
                b.advance_time(0.25);
            }
            for (i, d) in b.done_mut().iter_mut().enumerate() {
                *d = DoneCode(i as i32 % 3);
            }
            let before = b.clone();
            let ids: Vec<usize> = picks.iter().map(|p| p.index(n)).collect();
            b.reset_envs(&ids);

            for i in 0..n {
                if ids.contains(&i) {
                    prop_assert_eq!(b.timesteps()[i], 0);
                    prop_assert_eq!(b.time()[i], 0.0);
                    prop_assert_eq!(b.done()[i], DoneCode::NULL);
                } else {
                    prop_assert_eq!(b.timesteps()[i], before.timesteps()[i]);
                    prop_assert_eq!(b.time()[i].to_bits(), before.time()[i].to_bits());
                    prop_assert_eq!(b.done()[i], before.done()[i]);
                }
            }
        }
    }
}
