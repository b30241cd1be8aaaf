//! Pipeline composition.
//!
//! A chain is described by an ordered list of providers, outermost first.
//! Composition walks the list tail-first: the last provider builds the
//! terminal stage, every earlier provider wraps the stage built after it.
//! Providers are consumed by composition, so each one's `next` link is
//! resolved exactly once and no provider can end up in two chains.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

/// Errors raised while composing a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// A terminal provider appears before the end of the list.
    #[error("terminal stage {name:?} at position {position} is not last")]
    MisplacedTerminal { name: String, position: usize },

    /// The list ends in a wrapping provider and the fallback is not terminal.
    #[error("chain has no terminal stage (last stage {name:?} wraps another)")]
    MissingTerminal { name: String },
}

type TerminalFn<S> = Box<dyn FnOnce() -> Arc<S> + Send>;
type WrapFn<S> = Box<dyn FnOnce(Arc<S>) -> Arc<S> + Send>;

enum Build<S: ?Sized + 'static> {
    Terminal(TerminalFn<S>),
    Wrap(WrapFn<S>),
}

/// Recipe for one stage of a chain.
pub struct StageProvider<S: ?Sized + 'static> {
    name: String,
    build: Build<S>,
}

impl<S: ?Sized + 'static> StageProvider<S> {
    /// A provider for the innermost stage; it has no `next` link.
    pub fn terminal(
        name: impl Into<String>,
        build: impl FnOnce() -> Arc<S> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            build: Build::Terminal(Box::new(build)),
        }
    }

    /// A provider for a stage that wraps the already-built inner stage.
    pub fn wrap(
        name: impl Into<String>,
        build: impl FnOnce(Arc<S>) -> Arc<S> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            build: Build::Wrap(Box::new(build)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.build, Build::Terminal(_))
    }
}

impl<S: ?Sized + 'static> fmt::Debug for StageProvider<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageProvider")
            .field("name", &self.name)
            .field("terminal", &self.is_terminal())
            .finish()
    }
}

/// A finished, immutable chain of stages.
pub struct Pipeline<S: ?Sized + 'static> {
    head: Arc<S>,
    stage_names: Vec<String>,
}

impl<S: ?Sized + 'static> Pipeline<S> {
    /// Compose `providers` (outermost first) into a chain.
    ///
    /// When the list does not end in a terminal provider, the one returned
    /// by `default_terminal` is appended.
    pub fn compose(
        mut providers: Vec<StageProvider<S>>,
        default_terminal: impl FnOnce() -> StageProvider<S>,
    ) -> Result<Self, ChainError> {
        if let Some(position) = providers.iter().position(StageProvider::is_terminal) {
            if position + 1 != providers.len() {
                return Err(ChainError::MisplacedTerminal {
                    name: providers[position].name.clone(),
                    position,
                });
            }
        } else {
            let fallback = default_terminal();
            debug!(stage = %fallback.name, "appending implicit terminal stage");
            providers.push(fallback);
        }

        let stage_names: Vec<String> = providers.iter().map(|p| p.name.clone()).collect();

        let terminal = match providers.pop() {
            Some(StageProvider {
                build: Build::Terminal(build),
                ..
            }) => build,
            Some(StageProvider { name, .. }) => return Err(ChainError::MissingTerminal { name }),
            None => {
                return Err(ChainError::MissingTerminal {
                    name: String::new(),
                })
            }
        };

        let mut head = terminal();
        for provider in providers.into_iter().rev() {
            head = match provider.build {
                Build::Wrap(build) => build(head),
                Build::Terminal(_) => {
                    // Rejected above; kept total for the type checker.
                    return Err(ChainError::MisplacedTerminal {
                        name: provider.name,
                        position: 0,
                    });
                }
            };
        }

        debug!(stages = ?stage_names, "composed pipeline");
        Ok(Self { head, stage_names })
    }

    /// The outermost stage; calls enter the chain here.
    pub fn head(&self) -> &Arc<S> {
        &self.head
    }

    /// Stage names, outermost first.
    pub fn stage_names(&self) -> &[String] {
        &self.stage_names
    }

    pub fn len(&self) -> usize {
        self.stage_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stage_names.is_empty()
    }
}

impl<S: ?Sized + 'static> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            head: Arc::clone(&self.head),
            stage_names: self.stage_names.clone(),
        }
    }
}

impl<S: ?Sized + 'static> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    trait Stage: Send + Sync {
        fn describe(&self) -> String;
    }

    struct Leaf(&'static str);

    impl Stage for Leaf {
        fn describe(&self) -> String {
            self.0.to_string()
        }
    }

    struct Wrapper {
        name: &'static str,
        inner: Arc<dyn Stage>,
    }

    impl Stage for Wrapper {
        fn describe(&self) -> String {
            format!("{}({})", self.name, self.inner.describe())
        }
    }

    fn leaf(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> StageProvider<dyn Stage> {
        let log = Arc::clone(log);
        StageProvider::terminal(name, move || {
            log.lock().unwrap().push(name);
            Arc::new(Leaf(name)) as Arc<dyn Stage>
        })
    }

    fn wrapper(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> StageProvider<dyn Stage> {
        let log = Arc::clone(log);
        StageProvider::wrap(name, move |inner| {
            log.lock().unwrap().push(name);
            Arc::new(Wrapper { name, inner }) as Arc<dyn Stage>
        })
    }

    fn unused_default() -> StageProvider<dyn Stage> {
        StageProvider::terminal("unused", || -> Arc<dyn Stage> {
            panic!("default terminal must not be built")
        })
    }

    #[test]
    fn builds_tail_first_and_wraps_outward() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let providers = vec![
            wrapper("formatter", &log),
            wrapper("trace", &log),
            leaf("transport", &log),
        ];

        let pipeline = Pipeline::compose(providers, unused_default).unwrap();

        assert_eq!(pipeline.head().describe(), "formatter(trace(transport))");
        assert_eq!(*log.lock().unwrap(), vec!["transport", "trace", "formatter"]);
        assert_eq!(pipeline.stage_names(), &["formatter", "trace", "transport"]);
    }

    #[test]
    fn appends_default_terminal_when_missing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let default_log = Arc::clone(&log);

        let pipeline = Pipeline::compose(vec![wrapper("trace", &log)], move || {
            leaf("tcp", &default_log)
        })
        .unwrap();

        assert_eq!(pipeline.head().describe(), "trace(tcp)");
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn empty_list_is_just_the_default_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let default_log = Arc::clone(&log);
        let pipeline = Pipeline::compose(Vec::new(), move || leaf("tcp", &default_log)).unwrap();
        assert_eq!(pipeline.head().describe(), "tcp");
        assert_eq!(pipeline.stage_names(), &["tcp"]);
    }

    #[test]
    fn rejects_terminal_before_the_end() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let providers = vec![leaf("early", &log), wrapper("trace", &log)];

        let err = Pipeline::compose(providers, unused_default).unwrap_err();
        assert_eq!(
            err,
            ChainError::MisplacedTerminal {
                name: "early".to_string(),
                position: 0
            }
        );
        assert!(log.lock().unwrap().is_empty(), "nothing may be built on error");
    }

    #[test]
    fn rejects_non_terminal_default() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let default_log = Arc::clone(&log);
        let err = Pipeline::compose(Vec::new(), move || wrapper("oops", &default_log)).unwrap_err();
        assert!(matches!(err, ChainError::MissingTerminal { name } if name == "oops"));
    }

    #[test]
    fn head_is_shared_across_clones() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::compose(vec![leaf("only", &log)], unused_default).unwrap();
        let copy = pipeline.clone();
        assert!(Arc::ptr_eq(pipeline.head(), copy.head()));
        assert_eq!(log.lock().unwrap().len(), 1, "cloning must not rebuild stages");
    }
}
