//! Battery work queue
//!
//! A single task owns the [`Battery`] and runs monitor and cable work one at
//! a time. The polling timer, signals and control clients only post
//! messages. A work item already pending is not queued twice.

use midas_battery::{Battery, Followup, SupplyKind, VbusAction};
use midas_config::PollingType;
use midas_hal::mock::MockWakeLock;
use midas_hal::{CableType, Property, SysfsWakeLock, WakeLock};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::publish::Publisher;

pub const MONITOR_LOCK: &str = "midas-battery-monitor";
pub const CABLE_LOCK: &str = "midas-battery-cable";
pub const VBUS_LOCK: &str = "midas-battery-vbus";

/// Wake locks held around battery work
#[derive(Clone)]
pub struct WakeLocks {
    pub monitor: Arc<dyn WakeLock>,
    pub cable: Arc<dyn WakeLock>,
    pub vbus: Arc<dyn WakeLock>,
}

impl WakeLocks {
    pub fn sysfs(power_dir: &Path) -> Self {
        Self {
            monitor: Arc::new(SysfsWakeLock::new(MONITOR_LOCK, power_dir)),
            cable: Arc::new(SysfsWakeLock::new(CABLE_LOCK, power_dir)),
            vbus: Arc::new(SysfsWakeLock::new(VBUS_LOCK, power_dir)),
        }
    }

    pub fn mock() -> Self {
        Self {
            monitor: Arc::new(MockWakeLock::new(MONITOR_LOCK)),
            cable: Arc::new(MockWakeLock::new(CABLE_LOCK)),
            vbus: Arc::new(MockWakeLock::new(VBUS_LOCK)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Monitor,
    Cable,
}

/// Control request answered by the work queue task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get(Property),
    Set(Property, i32),
    /// `usb` or `ac` online
    SupplyOnline(SupplyKind),
    /// Cable reported by the charger driver
    Online(CableType),
    /// Cable interrupt line fired
    CableEvent,
    Show(String),
    Store(String, String),
    State,
}

pub type Reply = Result<String, String>;

enum Message {
    Job(Job),
    Suspend,
    Resume,
    Control(Request, oneshot::Sender<Reply>),
    Shutdown,
}

/// Handle for posting work
#[derive(Clone)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<Message>,
}

impl WorkQueue {
    fn post(&self, message: Message) {
        if self.tx.send(message).is_err() {
            tracing::warn!("Work queue is gone");
        }
    }

    pub fn queue(&self, job: Job) {
        self.post(Message::Job(job));
    }

    /// System is going to sleep
    pub fn suspend(&self) {
        self.post(Message::Suspend);
    }

    pub fn resume(&self) {
        self.post(Message::Resume);
    }

    pub fn shutdown(&self) {
        self.post(Message::Shutdown);
    }

    pub async fn request(&self, request: Request) -> Reply {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Message::Control(request, tx)).is_err() {
            return Err("battery service stopped".to_string());
        }
        rx.await
            .unwrap_or_else(|_| Err("battery service stopped".to_string()))
    }
}

/// Owner of the battery; see [`Worker::run`]
pub struct Worker {
    battery: Battery,
    rx: mpsc::UnboundedReceiver<Message>,
    locks: WakeLocks,
    publisher: Publisher,
    pending: VecDeque<Job>,
    deadline: Option<Instant>,
    suspended: bool,
}

pub fn channel(battery: Battery, locks: WakeLocks, publisher: Publisher) -> (WorkQueue, Worker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = Worker {
        battery,
        rx,
        locks,
        publisher,
        pending: VecDeque::new(),
        deadline: None,
        suspended: false,
    };
    (WorkQueue { tx }, worker)
}

impl Worker {
    /// Run until shutdown; the first monitor run is queued immediately
    pub async fn run(mut self) {
        tracing::info!("Battery work queue started");
        self.enqueue(Job::Monitor);
        self.battery.initial_check();

        loop {
            // take everything already posted so a suspend can cancel queued work
            while let Ok(message) = self.rx.try_recv() {
                if !self.accept(message) {
                    return self.stop();
                }
            }

            if let Some(job) = self.pending.pop_front() {
                self.execute(job);
                continue;
            }

            let deadline = self.deadline;
            let poll = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(message) => {
                        if !self.accept(message) {
                            return self.stop();
                        }
                    }
                    None => return self.stop(),
                },
                _ = poll => {
                    self.deadline = None;
                    tracing::debug!("Polling timer expired");
                    self.enqueue(Job::Monitor);
                }
            }
        }
    }

    fn stop(&mut self) {
        self.locks.monitor.unlock();
        self.locks.cable.unlock();
        self.locks.vbus.unlock();
        tracing::info!("Battery work queue stopped");
    }

    /// Returns `false` on shutdown
    fn accept(&mut self, message: Message) -> bool {
        match message {
            Message::Job(job) => self.enqueue(job),
            Message::Suspend => self.suspend(),
            Message::Resume => self.resume(),
            Message::Control(request, reply) => {
                let _ = reply.send(self.control(request));
            }
            Message::Shutdown => return false,
        }
        true
    }

    fn enqueue(&mut self, job: Job) {
        if self.pending.contains(&job) {
            return;
        }

        match job {
            Job::Monitor => self.locks.monitor.lock(),
            Job::Cable => self.locks.cable.lock(),
        }
        self.pending.push_back(job);
    }

    fn execute(&mut self, job: Job) {
        match job {
            Job::Monitor => {
                let report = self.battery.monitor();
                self.publisher.state(self.battery.snapshot());

                if report.cable_changed {
                    self.enqueue(Job::Cable);
                }

                self.deadline = report.next_poll.map(|delay| Instant::now() + delay);
                if let Some(delay) = report.next_poll {
                    tracing::debug!("Next poll in {:?}", delay);
                }
                self.locks.monitor.unlock();
            }
            Job::Cable => {
                match self.battery.cable_work() {
                    VbusAction::None => {}
                    VbusAction::Hold => self.locks.vbus.lock(),
                    VbusAction::HoldFor(timeout) => self.locks.vbus.lock_timeout(timeout),
                }
                self.locks.cable.unlock();
            }
        }
    }

    fn suspend(&mut self) {
        if self.suspended {
            return;
        }
        self.suspended = true;

        let before = self.pending.len();
        self.pending.retain(|job| *job != Job::Monitor);
        if self.pending.len() != before {
            self.locks.monitor.unlock();
        }

        // an alarm still wakes the system; other timers stop while asleep
        if self.battery.config().monitor.polling != PollingType::Alarm {
            self.deadline = None;
        }

        self.battery.set_long_polling(true);
        tracing::info!("Suspended");
    }

    fn resume(&mut self) {
        if !self.suspended {
            return;
        }
        self.suspended = false;

        self.battery.set_long_polling(false);
        self.enqueue(Job::Monitor);
        tracing::info!("Resumed");
    }

    fn control(&mut self, request: Request) -> Reply {
        tracing::debug!("Control request {:?}", request);
        let battery = &mut self.battery;

        match request {
            Request::Get(prop) => battery
                .get_property(prop)
                .map(|value| value.to_string())
                .map_err(|e| e.to_string()),
            Request::Set(prop, value) => {
                let followup = battery.set_property(prop, value).map_err(|e| e.to_string())?;
                self.follow(followup);
                Ok(String::new())
            }
            Request::Online(cable) => {
                let followup = battery
                    .set_property(Property::Online, cable.to_raw())
                    .map_err(|e| e.to_string())?;
                self.follow(followup);
                Ok(String::new())
            }
            Request::SupplyOnline(supply) => {
                let online = match supply {
                    SupplyKind::Usb => battery.usb_online(),
                    SupplyKind::Ac => battery.ac_online(),
                    SupplyKind::Battery => battery.info().present,
                };
                Ok(u8::from(online).to_string())
            }
            Request::CableEvent => {
                if !battery.cable_interrupt_enabled() {
                    return Err("cable interrupt is not enabled".to_string());
                }
                self.enqueue(Job::Cable);
                Ok(String::new())
            }
            Request::Show(name) => battery.show_attr(&name).map_err(|e| e.to_string()),
            Request::Store(name, value) => battery
                .store_attr(&name, &value)
                .map(|()| String::new())
                .map_err(|e| e.to_string()),
            Request::State => {
                serde_json::to_string(&battery.snapshot()).map_err(|e| e.to_string())
            }
        }
    }

    fn follow(&mut self, followup: Followup) {
        if followup == Followup::CableWork {
            self.enqueue(Job::Cable);
        }
    }
}
