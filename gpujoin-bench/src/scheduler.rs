//! Kernel launch scheduler for one table set.
//!
//! ```text
//! Ready -> Launching -> Collecting -> Done
//!              |  ^          |
//!              |  +----------+   (next timed run)
//!              v
//!           Aborted
//! ```
//!
//! Every run records the host wall time from enqueue through read-back and
//! the device-reported kernel time. Sets larger than 3M run once; that
//! sample is scaled by the run count before averaging, so the reported value
//! is the single-run measurement.

use gpujoin_runtime::{JoinDevice, ProcessingWindow, RuntimeError, WallTimer};
use tracing::{debug, info};

use crate::catalog::TableSetId;
use crate::config::RunCount;
use crate::loader::TableArray;
use crate::output::timefmt::human_duration;
use crate::results::RunMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Ready,
    Launching,
    Collecting,
    Done,
    Aborted,
}

/// Outcome of a completed set.
#[derive(Debug, Clone)]
pub struct SetRun {
    pub metrics: RunMetrics,
    /// Runs actually executed.
    pub iterations: u32,
}

/// Drives the timed runs of one table set through its processing window.
pub struct SetScheduler {
    set: TableSetId,
    runs: RunCount,
    local: (usize, usize),
    state: LaunchState,
}

impl SetScheduler {
    pub fn new(set: TableSetId, runs: RunCount, local: (usize, usize)) -> Self {
        Self {
            set,
            runs,
            local,
            state: LaunchState::Ready,
        }
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    fn transition(&mut self, next: LaunchState) {
        debug!(set = %self.set, from = ?self.state, to = ?next, "launch state");
        self.state = next;
    }

    /// Run the join `runs` times, overwriting the id column of `left` with
    /// the device output after every run.
    pub fn run<D: JoinDevice>(
        &mut self,
        device: &D,
        left: &mut TableArray,
        lookup: &TableArray,
    ) -> Result<SetRun, RuntimeError> {
        let result = self.run_inner(device, left, lookup);
        if result.is_err() {
            self.transition(LaunchState::Aborted);
        }
        result
    }

    fn run_inner<D: JoinDevice>(
        &mut self,
        device: &D,
        left: &mut TableArray,
        lookup: &TableArray,
    ) -> Result<SetRun, RuntimeError> {
        let window = ProcessingWindow::open(device, &left.rows, &lookup.rows, self.local)?;
        info!("Begin GPU processing");

        let runs = self.runs.get();
        let mut ids = vec![0u32; left.len()];
        let mut device_time = 0.0;
        let mut wall_time = 0.0;
        let mut samples = Vec::with_capacity(runs as usize);
        let mut iterations = 0;

        for run in 0..runs {
            self.transition(LaunchState::Launching);
            let timer = WallTimer::start();
            let elapsed = window.launch()?;

            self.transition(LaunchState::Collecting);
            window.read_output(&mut ids)?;
            left.set_ids(&ids);
            wall_time += timer.stop();

            let t = elapsed.as_secs_f64();
            if runs > 1 {
                info!("run {} time: {}", run, human_duration(t));
            }
            device_time += t;
            samples.push(t);
            iterations += 1;

            if self.set.is_large() {
                info!("Running only once for this tblset");
                device_time *= f64::from(runs);
                wall_time *= f64::from(runs);
                break;
            }
        }
        window.close();

        device_time /= f64::from(runs);
        wall_time /= f64::from(runs);
        self.transition(LaunchState::Done);

        info!("Done!");
        if runs == 1 {
            info!(" GPU (profiling) time: {}", human_duration(device_time));
            info!(" total (GPU+Host) time: {}", human_duration(wall_time));
        } else {
            info!(" avg. GPU time: {}", human_duration(device_time));
            info!(" avg. total time: {}", human_duration(wall_time));
        }

        let mut metrics =
            RunMetrics::new(self.set, device_time, wall_time, left.len(), lookup.len());
        metrics.device_samples = samples;
        Ok(SetRun {
            metrics,
            iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpujoin_runtime::{DeviceInfo, LaunchGeometry, TableRow};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Returns scripted kernel times and echoes lookup ids by row index.
    struct ScriptedDevice {
        times: RefCell<VecDeque<Duration>>,
        launches: Cell<u32>,
        fail_on: Option<u32>,
        live: Cell<i32>,
    }

    impl ScriptedDevice {
        fn new(times_ms: &[u64]) -> Self {
            Self {
                times: RefCell::new(times_ms.iter().map(|&ms| Duration::from_millis(ms)).collect()),
                launches: Cell::new(0),
                fail_on: None,
                live: Cell::new(0),
            }
        }
    }

    impl JoinDevice for ScriptedDevice {
        type Buffers = Vec<u32>;

        fn info(&self) -> DeviceInfo {
            DeviceInfo {
                platform: "test".into(),
                device: "scripted".into(),
            }
        }

        fn acquire(
            &self,
            left: &[TableRow],
            lookup: &[TableRow],
            _geometry: &LaunchGeometry,
        ) -> Result<Vec<u32>, RuntimeError> {
            self.live.set(self.live.get() + 1);
            Ok((0..left.len()).map(|i| lookup[i % lookup.len()].id).collect())
        }

        fn launch(&self, _buffers: &Vec<u32>) -> Result<Duration, RuntimeError> {
            let n = self.launches.get();
            self.launches.set(n + 1);
            if self.fail_on == Some(n) {
                return Err(RuntimeError::Enqueue("scripted failure".into()));
            }
            Ok(self.times.borrow_mut().pop_front().unwrap_or_default())
        }

        fn read_output(&self, buffers: &Vec<u32>, ids: &mut [u32]) -> Result<(), RuntimeError> {
            ids.copy_from_slice(buffers);
            Ok(())
        }

        fn release(&self, _buffers: Vec<u32>) {
            self.live.set(self.live.get() - 1);
        }
    }

    fn tables(n: u32) -> (TableArray, TableArray) {
        let left = TableArray::new("lpt", (0..n).map(|_| TableRow::new(0, b"x")).collect());
        let lookup = TableArray::new("pt", (1..=n).map(|i| TableRow::new(i, b"x")).collect());
        (left, lookup)
    }

    #[test]
    fn test_runs_are_averaged() {
        let dev = ScriptedDevice::new(&[10, 30]);
        let (mut left, lookup) = tables(4);
        let mut sched = SetScheduler::new(TableSetId::S208K, RunCount::new(2).unwrap(), (16, 1));
        let out = sched.run(&dev, &mut left, &lookup).unwrap();
        assert_eq!(out.iterations, 2);
        assert!((out.metrics.device_time - 0.020).abs() < 1e-9);
        assert_eq!(out.metrics.device_samples.len(), 2);
        assert_eq!(sched.state(), LaunchState::Done);
        assert_eq!(dev.live.get(), 0);
    }

    #[test]
    fn test_output_overwrites_left_ids() {
        let dev = ScriptedDevice::new(&[1]);
        let (mut left, lookup) = tables(3);
        let mut sched = SetScheduler::new(TableSetId::S416K, RunCount::new(1).unwrap(), (16, 1));
        sched.run(&dev, &mut left, &lookup).unwrap();
        assert_eq!(left.ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_large_set_runs_once() {
        let dev = ScriptedDevice::new(&[40, 1000, 1000, 1000]);
        let (mut left, lookup) = tables(2);
        let mut sched = SetScheduler::new(TableSetId::S7M, RunCount::new(4).unwrap(), (16, 1));
        let out = sched.run(&dev, &mut left, &lookup).unwrap();
        assert_eq!(out.iterations, 1);
        assert_eq!(dev.launches.get(), 1);
        assert!((out.metrics.device_time - 0.040).abs() < 1e-9);
    }

    #[test]
    fn test_3m_is_not_large() {
        let dev = ScriptedDevice::new(&[5, 5, 5]);
        let (mut left, lookup) = tables(2);
        let mut sched = SetScheduler::new(TableSetId::S3M, RunCount::new(3).unwrap(), (16, 1));
        let out = sched.run(&dev, &mut left, &lookup).unwrap();
        assert_eq!(out.iterations, 3);
    }

    #[test]
    fn test_launch_failure_aborts_and_releases() {
        let mut dev = ScriptedDevice::new(&[5, 5]);
        dev.fail_on = Some(1);
        let (mut left, lookup) = tables(2);
        let mut sched = SetScheduler::new(TableSetId::S208K, RunCount::new(2).unwrap(), (16, 1));
        assert!(sched.run(&dev, &mut left, &lookup).is_err());
        assert_eq!(sched.state(), LaunchState::Aborted);
        assert_eq!(dev.live.get(), 0);
    }
}
