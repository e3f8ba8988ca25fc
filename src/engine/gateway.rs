//! Serialised access to the comparison engine.
//!
//! Engines in this family are not safe under concurrent compare calls, so the
//! gateway holds one process-wide lock for the whole of a compare: both
//! directions of a pairwise compare run under a single acquisition, and no
//! other compare (from any gateway instance) can interleave between them.
//!
//! Rendering does not go through the gateway and never takes the lock.

use super::{run_blocking, CompareSettings, ComparisonEngine, EngineDocument, EngineOutput};
use crate::error::CompareError;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

static ENGINE_LOCK: Mutex<()> = Mutex::new(());

/// The only path to [`ComparisonEngine::compare`].
#[derive(Clone)]
pub struct EngineGateway {
    engine: Arc<dyn ComparisonEngine>,
}

impl EngineGateway {
    pub fn new(engine: Arc<dyn ComparisonEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn ComparisonEngine> {
        &self.engine
    }

    /// Compare two documents in both directions.
    ///
    /// Returns `(forward, reverse)`: the forward pass uses `first` as base and
    /// `second` as revision, the reverse pass swaps them. A null result from
    /// either pass fails the whole call.
    pub async fn compare_pair(
        &self,
        first: EngineDocument,
        second: EngineDocument,
        settings: CompareSettings,
    ) -> Result<(EngineOutput, EngineOutput), CompareError> {
        let engine = Arc::clone(&self.engine);
        run_blocking("Compare", move || {
            let _guard = ENGINE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            debug!("Engine lock acquired for pairwise compare");

            let forward = engine
                .compare(&first, std::slice::from_ref(&second), &settings)?
                .ok_or(CompareError::EmptyResult { pass: "forward" })?;
            info!(
                "Forward pass: '{}' → '{}' ({} changes)",
                first.name(),
                second.name(),
                forward.changes.len()
            );

            let reverse = engine
                .compare(&second, std::slice::from_ref(&first), &settings)?
                .ok_or(CompareError::EmptyResult { pass: "reverse" })?;
            info!(
                "Reverse pass: '{}' → '{}' ({} changes)",
                second.name(),
                first.name(),
                reverse.changes.len()
            );

            Ok((forward, reverse))
        })
        .await
    }

    /// Compare the first document against all the others in one session.
    pub async fn compare_chain(
        &self,
        documents: Vec<EngineDocument>,
        settings: CompareSettings,
    ) -> Result<EngineOutput, CompareError> {
        let engine = Arc::clone(&self.engine);
        run_blocking("Compare", move || {
            let Some((base, revisions)) = documents.split_first() else {
                return Err(CompareError::InvalidInput {
                    expected: "at least 2 documents",
                    actual: 0,
                });
            };

            let _guard = ENGINE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            debug!("Engine lock acquired for multi compare");

            let output = engine
                .compare(base, revisions, &settings)?
                .ok_or(CompareError::EmptyResult { pass: "chained" })?;
            info!(
                "Chained pass: '{}' + {} revision(s) ({} changes)",
                base.name(),
                revisions.len(),
                output.changes.len()
            );
            Ok(output)
        })
        .await
    }
}

impl std::fmt::Debug for EngineGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineGateway")
            .field("engine", &self.engine.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PageImage;
    use crate::error::{EngineError, ErrorKind};
    use crate::output::{ChangeKind, ChangeRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records call order and flags any overlap between compare calls.
    #[derive(Default)]
    struct Recorder {
        active: AtomicUsize,
        overlaps: AtomicUsize,
        calls: Mutex<Vec<(String, String)>>,
        null_on_call: Option<usize>,
    }

    impl ComparisonEngine for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn supports(&self, _extension: &str) -> bool {
            true
        }

        fn compare(
            &self,
            base: &EngineDocument,
            revisions: &[EngineDocument],
            _settings: &CompareSettings,
        ) -> Result<Option<EngineOutput>, EngineError> {
            if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(5));
            let call_no = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((base.name().to_string(), revisions[0].name().to_string()));
                calls.len()
            };
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.null_on_call == Some(call_no) {
                return Ok(None);
            }
            Ok(Some(EngineOutput {
                changes: vec![ChangeRecord::new(0, ChangeKind::Inserted, revisions[0].name())],
                document: base.bytes().to_vec(),
            }))
        }

        fn page_count(&self, _document: &EngineDocument) -> Result<usize, EngineError> {
            Ok(1)
        }

        fn render_page(&self, _d: &EngineDocument, _p: usize) -> Result<PageImage, EngineError> {
            Err(EngineError::RenderFailed {
                page: 1,
                detail: "recorder".into(),
            })
        }
    }

    fn doc(name: &str) -> EngineDocument {
        EngineDocument::new(name, name.as_bytes().to_vec(), None)
    }

    #[tokio::test]
    async fn pair_runs_forward_then_reverse() {
        let recorder = Arc::new(Recorder::default());
        let gateway = EngineGateway::new(recorder.clone());
        let (fwd, rev) = gateway
            .compare_pair(doc("a.txt"), doc("b.txt"), CompareSettings::default())
            .await
            .unwrap();

        assert_eq!(fwd.document, b"a.txt");
        assert_eq!(rev.document, b"b.txt");
        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            [
                ("a.txt".to_string(), "b.txt".to_string()),
                ("b.txt".to_string(), "a.txt".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn null_reverse_fails_the_pair() {
        let recorder = Arc::new(Recorder {
            null_on_call: Some(2),
            ..Recorder::default()
        });
        let err = EngineGateway::new(recorder)
            .compare_pair(doc("a.txt"), doc("b.txt"), CompareSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::EmptyResult { pass: "reverse" }));
        assert_eq!(err.kind(), ErrorKind::FatalCompare);
    }

    #[tokio::test]
    async fn chain_passes_all_revisions() {
        let recorder = Arc::new(Recorder::default());
        let out = EngineGateway::new(recorder.clone())
            .compare_chain(
                vec![doc("a.txt"), doc("b.txt"), doc("c.txt")],
                CompareSettings::default(),
            )
            .await
            .unwrap();
        assert_eq!(out.document, b"a.txt");
        assert_eq!(recorder.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_compares_never_overlap() {
        let recorder = Arc::new(Recorder::default());
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                // separate gateways share the process-wide lock
                let gateway = EngineGateway::new(recorder.clone());
                tokio::spawn(async move {
                    gateway
                        .compare_pair(
                            doc(&format!("a{i}.txt")),
                            doc(&format!("b{i}.txt")),
                            CompareSettings::default(),
                        )
                        .await
                })
            })
            .collect();
        for t in futures::future::join_all(tasks).await {
            t.unwrap().unwrap();
        }

        assert_eq!(recorder.overlaps.load(Ordering::SeqCst), 0);
        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 16);
        // each reverse pass directly follows its forward pass
        for pair in calls.chunks(2) {
            assert_eq!(pair[0].0, pair[1].1);
            assert_eq!(pair[0].1, pair[1].0);
        }
    }
}
