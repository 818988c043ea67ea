//! Scripted collaborators (testing only)
//!
//! `ScriptedTransformer` replays queued replies and `ScriptedExecutor` either
//! replays queued results or evaluates a rule. Both record every call so
//! tests can assert on call counts and the exact context passed along.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{ModuleIdentity, TestArtifact, TransformError};
use crate::sandbox::{ExecutionResult, ExecutorError, ExecutorResult, TestExecutor};
use crate::transformer::CodeTransformer;

// ---------------------------------------------------------------------------
// ScriptedTransformer
// ---------------------------------------------------------------------------

/// One recorded transformer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformCall {
    pub instruction: String,
    pub content: String,
}

/// Transformer that answers from a queue of scripted replies.
#[derive(Debug, Default)]
pub struct ScriptedTransformer {
    replies: Mutex<VecDeque<Result<String, TransformError>>>,
    calls: Mutex<Vec<TransformCall>>,
}

impl ScriptedTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies in call order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let t = Self::new();
        for r in replies {
            t.push_reply(r);
        }
        t
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, err: TransformError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<TransformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CodeTransformer for ScriptedTransformer {
    async fn transform(&self, instruction: &str, content: &str) -> Result<String, TransformError> {
        self.calls.lock().unwrap().push(TransformCall {
            instruction: instruction.to_string(),
            content: content.to_string(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransformError::Network("script exhausted".into())))
    }
}

// ---------------------------------------------------------------------------
// ScriptedExecutor
// ---------------------------------------------------------------------------

/// One recorded executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteCall {
    pub code: String,
    pub tests: String,
}

type Rule = Box<dyn Fn(&str, &str) -> ExecutionResult + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<ExecutorResult<ExecutionResult>>>),
    Rule(Rule),
}

/// Executor that never touches a filesystem or interpreter.
pub struct ScriptedExecutor {
    module: ModuleIdentity,
    script: Script,
    calls: Mutex<Vec<ExecuteCall>>,
}

impl ScriptedExecutor {
    /// Replay `results` in call order; an exhausted queue is an executor error.
    pub fn with_results(results: impl IntoIterator<Item = ExecutionResult>) -> Self {
        Self {
            module: ModuleIdentity::default(),
            script: Script::Queue(Mutex::new(results.into_iter().map(Ok).collect())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Decide each run from `(code, tests)`.
    pub fn with_rule<F>(rule: F) -> Self
    where
        F: Fn(&str, &str) -> ExecutionResult + Send + Sync + 'static,
    {
        Self {
            module: ModuleIdentity::default(),
            script: Script::Rule(Box::new(rule)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue an executor failure after any already-queued results.
    ///
    /// Only queue-backed executors can fail this way; a rule-backed executor
    /// drops the error (and trips a debug assertion).
    pub fn push_error(&self, err: ExecutorError) {
        match &self.script {
            Script::Queue(q) => q.lock().unwrap().push_back(Err(err)),
            Script::Rule(_) => debug_assert!(false, "push_error on a rule-backed ScriptedExecutor"),
        }
    }

    pub fn calls(&self) -> Vec<ExecuteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TestExecutor for ScriptedExecutor {
    fn module(&self) -> &ModuleIdentity {
        &self.module
    }

    async fn run(&self, code: &str, tests: &TestArtifact) -> ExecutorResult<ExecutionResult> {
        self.calls.lock().unwrap().push(ExecuteCall {
            code: code.to_string(),
            tests: tests.as_str().to_string(),
        });
        match &self.script {
            Script::Queue(q) => q.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(ExecutorError::Spawn {
                    program: "scripted".into(),
                    reason: "script exhausted".into(),
                })
            }),
            Script::Rule(rule) => Ok(rule(code, tests.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_transformer_replays_in_order() {
        let t = ScriptedTransformer::with_replies(["one", "two"]);
        assert_eq!(t.transform("i", "c").await.unwrap(), "one");
        assert_eq!(t.transform("i", "c").await.unwrap(), "two");
        assert!(t.transform("i", "c").await.is_err());
        assert_eq!(t.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_executor_rule_and_queue() {
        let rule = ScriptedExecutor::with_rule(|code, _| {
            if code.contains("ok") {
                ExecutionResult::passed("1 passed")
            } else {
                ExecutionResult::failed("1 failed")
            }
        });
        let tests = TestArtifact::new("t");
        assert!(rule.run("ok", &tests).await.unwrap().passed);
        assert!(!rule.run("bad", &tests).await.unwrap().passed);

        let queue = ScriptedExecutor::with_results([ExecutionResult::passed("")]);
        assert!(queue.run("x", &tests).await.unwrap().passed);
        assert!(queue.run("x", &tests).await.is_err());
        assert_eq!(queue.calls()[1].tests, "t");
    }

    #[tokio::test]
    async fn test_pushed_error_follows_queued_results() {
        let queue = ScriptedExecutor::with_results([ExecutionResult::passed("")]);
        queue.push_error(ExecutorError::Timeout { limit_secs: 5 });
        let tests = TestArtifact::new("t");
        assert!(queue.run("x", &tests).await.unwrap().passed);
        assert!(matches!(
            queue.run("x", &tests).await,
            Err(ExecutorError::Timeout { limit_secs: 5 })
        ));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "rule-backed")]
    fn test_push_error_on_rule_executor_panics_in_debug() {
        let rule = ScriptedExecutor::with_rule(|_, _| ExecutionResult::passed(""));
        rule.push_error(ExecutorError::Timeout { limit_secs: 1 });
    }
}
