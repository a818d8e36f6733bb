// THEORY:
// `FilterService` is the asynchronous front door for collaborators that live on a
// tokio runtime (an HTTP handler, a batch job). The engine itself is synchronous
// and blocks its caller until the whole image is done, so calling it directly from
// an async task would stall the runtime. The service instead:
//   1. queues requests on a bounded mpsc channel,
//   2. has a single dispatcher task take them off the queue,
//   3. runs each one with `spawn_blocking`, which blocks a tokio blocking thread
//      while the engine's own rayon pool does the fan-out/fan-in,
//   4. sends the result back on the request's oneshot channel.
//
// A semaphore caps how many images are in flight, so a burst of requests queues up
// instead of piling every image into memory at once. All requests share the one
// engine and therefore the one work-stealing pool.

use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::EngineError;
use crate::pipeline::{FilterEngine, FilterRequest};
use futures::future::join_all;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, oneshot};

const QUEUE_DEPTH: usize = 32;
const MAX_IN_FLIGHT: usize = 4;

pub type FilterResult = Result<PixelBuffer, EngineError>;

pub struct FilterTask {
    pub request: FilterRequest,
    pub buffer: PixelBuffer,
    pub result_sender: oneshot::Sender<FilterResult>,
}

pub struct FilterService {
    task_sender: mpsc::Sender<FilterTask>,
    dispatcher: tokio::task::JoinHandle<()>,
}

impl FilterService {
    /// Must be called from within a tokio runtime.
    pub fn new(engine: Arc<FilterEngine>) -> Self {
        let (task_sender, mut task_receiver) = mpsc::channel::<FilterTask>(QUEUE_DEPTH);
        let permits = Arc::new(Semaphore::new(MAX_IN_FLIGHT));

        let dispatcher = tokio::spawn(async move {
            while let Some(task) = task_receiver.recv().await {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let engine = engine.clone();
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    let FilterTask {
                        request,
                        buffer,
                        result_sender,
                    } = task;
                    let result = engine.apply(&request, buffer);
                    if result_sender.send(result).is_err() {
                        debug!("caller for {} went away before the result", request.name);
                    }
                });
            }
        });

        Self {
            task_sender,
            dispatcher,
        }
    }

    pub async fn process(&self, request: FilterRequest, buffer: PixelBuffer) -> FilterResult {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = FilterTask {
            request,
            buffer,
            result_sender,
        };

        self.task_sender
            .send(task)
            .await
            .map_err(|_| EngineError::ServiceClosed)?;

        result_receiver.await.map_err(|_| EngineError::ServiceClosed)?
    }

    /// Submits every job at once and waits for all of them, preserving order.
    pub async fn process_batch(
        &self,
        jobs: Vec<(FilterRequest, PixelBuffer)>,
    ) -> Vec<FilterResult> {
        join_all(
            jobs.into_iter()
                .map(|(request, buffer)| self.process(request, buffer)),
        )
        .await
    }

    /// Stops accepting requests and waits for the dispatcher to drain the queue.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        if let Err(e) = self.dispatcher.await {
            warn!("filter dispatcher ended abnormally: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::catalog::Catalogs;
    use crate::pipeline::EngineConfig;

    fn service() -> FilterService {
        let config = EngineConfig {
            worker_threads: 2,
            ..EngineConfig::default()
        };
        let engine = FilterEngine::new(config, Catalogs::builtin()).unwrap();
        FilterService::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn processes_a_request() {
        let service = service();
        let buffer = PixelBuffer::new(8, 8, 0xFF00_0000);
        let out = service
            .process(FilterRequest::new("invert", 0), buffer)
            .await
            .unwrap();
        assert!(out.to_argb_vec().iter().all(|&p| p == 0xFFFF_FFFF));
        service.shutdown().await;
    }

    #[tokio::test]
    async fn oversized_blurs_come_back_as_results() {
        let service = service();
        let buffer = PixelBuffer::new(12, 12, 0xFF40_4040);
        let out = service
            .process(FilterRequest::new("gauss", 400), buffer.clone())
            .await
            .unwrap();
        assert_eq!(out, buffer);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn batch_results_keep_submission_order() {
        let service = service();
        let jobs = (0..10)
            .map(|i| {
                let name = if i % 3 == 0 { "nope" } else { "gray" };
                (FilterRequest::new(name, 0), PixelBuffer::new(4, 4, 0xFF30_6090))
            })
            .collect();

        let results = service.process_batch(jobs).await;
        assert_eq!(results.len(), 10);
        for (i, result) in results.iter().enumerate() {
            match result {
                Err(EngineError::UnknownFilter(_)) => assert_eq!(i % 3, 0),
                Ok(buffer) => assert_eq!(buffer.get(0, 0), 0xFF60_6060),
                Err(other) => panic!("unexpected {other}"),
            }
        }
        service.shutdown().await;
    }
}
