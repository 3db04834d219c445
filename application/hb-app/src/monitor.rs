//! 一定間隔で問い合わせを繰り返すタイマー（インストール状態の表示用）

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// 所有者が破棄するまで tick を一定間隔で呼ぶ。
///
/// 初回は開始直後に呼ぶ。破棄時に停止してスレッドを join する。
pub struct PeriodicTask {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn start<F>(interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let worker = std::thread::Builder::new()
            .name("hb-periodic".into())
            .spawn(move || loop {
                tick();
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(Self {
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("periodic task panicked");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let task = PeriodicTask::start(Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        std::thread::sleep(Duration::from_millis(200));
        task.stop();
        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 2, "ticked {after_stop} times");
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn first_tick_is_immediate_and_drop_stops_promptly() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let started = std::time::Instant::now();
        {
            let _task = PeriodicTask::start(Duration::from_secs(60), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            std::thread::sleep(Duration::from_millis(50));
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
