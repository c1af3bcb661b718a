//! Per-stream FIFO queue: `idle -> running -> (idle | draining) -> removed`.
//!
//! A queue is created lazily on the first record for its stream and torn down only
//! after being observed idle with an empty backlog, per the design notes on not
//! retaining workers for inactive streams.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{oneshot, Mutex as TokioMutex, RwLock};
use tracing::trace;

use super::{partition_handlers, DeliveryStatus, Subscriptions};
use crate::error::DynError;
use crate::event::EventRecord;

struct QueueItem {
    record: EventRecord,
    status: DeliveryStatus,
    completion: oneshot::Sender<Result<(), Vec<DynError>>>,
}

pub(super) struct StreamQueue {
    backlog: Arc<StdMutex<VecDeque<QueueItem>>>,
    running: Arc<AtomicBool>,
}

impl StreamQueue {
    pub fn new() -> Self {
        Self {
            backlog: Arc::new(StdMutex::new(VecDeque::new())),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enqueues `record`, spawning the drain worker if this is the first item since the
    /// queue went idle. `queues`/`stream` let the drain worker remove this queue's own
    /// entry from the outer map once it actually goes idle, rather than leaking one entry
    /// per stream ever seen.
    pub fn enqueue(
        &mut self,
        record: EventRecord,
        status: DeliveryStatus,
        subscriptions: Arc<RwLock<Subscriptions>>,
        queues: Arc<TokioMutex<HashMap<String, StreamQueue>>>,
        stream: String,
    ) -> oneshot::Receiver<Result<(), Vec<DynError>>> {
        let (completion, receiver) = oneshot::channel();
        self.backlog.lock().unwrap().push_back(QueueItem { record, status, completion });

        if !self.running.swap(true, Ordering::SeqCst) {
            tokio::spawn(Self::drain(self.backlog.clone(), self.running.clone(), subscriptions, queues, stream));
        }

        receiver
    }

    async fn drain(
        backlog: Arc<StdMutex<VecDeque<QueueItem>>>,
        running: Arc<AtomicBool>,
        subscriptions: Arc<RwLock<Subscriptions>>,
        queues: Arc<TokioMutex<HashMap<String, StreamQueue>>>,
        stream: String,
    ) {
        loop {
            let next = backlog.lock().unwrap().pop_front();
            let item = match next {
                Some(item) => item,
                None => {
                    // Hold the outer map's lock while deciding to go idle: any enqueue
                    // racing us for this stream also needs that lock (see `Projector::push`),
                    // so once we have it no new item can appear behind our back.
                    let mut queues = queues.lock().await;
                    if backlog.lock().unwrap().is_empty() {
                        running.store(false, Ordering::SeqCst);
                        queues.remove(&stream);
                        trace!(stream = %stream, "projector queue drained, worker removed");
                        return;
                    }
                    continue;
                }
            };

            Self::dispatch(item, &subscriptions).await;
        }
    }

    async fn dispatch(item: QueueItem, subscriptions: &Arc<RwLock<Subscriptions>>) {
        let (once, continuous, all) = {
            let subscriptions = subscriptions.read().await;
            partition_handlers(&subscriptions, &item.record, item.status)
        };

        for subscriber in once {
            match subscriber.handle(&item.record).await {
                Ok(data) => subscriber.on_success(data, &item.record).await,
                Err(error) => subscriber.on_error(error, &item.record).await,
            }
        }

        type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), DynError>> + Send>>;
        let mut futures: Vec<HandlerFuture> = Vec::with_capacity(continuous.len() + all.len());

        for subscriber in continuous.into_iter().chain(all) {
            let record = item.record.clone();
            futures.push(Box::pin(async move { subscriber.handle(&record).await }));
        }

        let errors: Vec<DynError> = futures::future::join_all(futures)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        let _ = item.completion.send(if errors.is_empty() { Ok(()) } else { Err(errors) });
    }
}
