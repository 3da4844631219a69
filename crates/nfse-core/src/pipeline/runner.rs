//! Sequential pipeline runner.
//!
//! A pipeline threads one payload through an ordered list of tasks. The
//! first failing task aborts the run; its error is wrapped into a
//! [`PipelineError`] naming the pipeline, and no later task runs.

use std::fmt;

use tracing::{debug, error, info, info_span};

use super::payload::Payload;
use super::task::Task;
use crate::error::{PipelineError, ValidationError};

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Running the task at this index.
    Running(usize),
    Completed,
    /// The task at this index failed.
    Failed(usize),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running(i) => write!(f, "running({i})"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(i) => write!(f, "failed({i})"),
        }
    }
}

/// An ordered sequence of tasks.
pub struct Pipeline {
    name: String,
    tasks: Vec<Box<dyn Task>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, tasks: Vec<Box<dyn Task>>) -> Self {
        Self {
            name: name.into(),
            tasks,
        }
    }

    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder {
            name: name.into(),
            tasks: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task in order, feeding each output into the next task.
    ///
    /// Returns the last task's output unchanged, or `input` itself when the
    /// pipeline has no tasks.
    pub fn run(&self, input: Payload) -> Result<Payload, PipelineError> {
        let span = info_span!("pipeline", name = %self.name);
        let _guard = span.enter();

        let mut state = PipelineState::Idle;
        debug!(%state, tasks = self.tasks.len(), "starting pipeline");

        let mut current = input;
        for (i, task) in self.tasks.iter().enumerate() {
            state = PipelineState::Running(i);
            debug!(%state, task = task.name(), "running task");

            current = match task.run(current) {
                Ok(output) => output,
                Err(task_error) => {
                    state = PipelineState::Failed(i);
                    let err = PipelineError::new(self.name.clone(), task_error);
                    error!(%state, "{err}");
                    return Err(err);
                }
            };
        }

        state = PipelineState::Completed;
        info!(%state, output = %current.type_name(), "pipeline finished");
        Ok(current)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("tasks", &self.task_names())
            .finish()
    }
}

/// Builds a pipeline from tasks whose construction may fail.
pub struct PipelineBuilder {
    name: String,
    tasks: Vec<Box<dyn Task>>,
    error: Option<ValidationError>,
}

impl PipelineBuilder {
    pub fn task<T: Task + 'static>(mut self, task: T) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    /// Append a task, remembering the first construction error.
    pub fn try_task<T: Task + 'static>(mut self, task: Result<T, ValidationError>) -> Self {
        match task {
            Ok(task) => self.tasks.push(Box::new(task)),
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(err);
                }
            }
        }
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        match self.error {
            Some(err) => {
                let err = PipelineError::new(self.name, err);
                error!("{err}");
                Err(err)
            }
            None => Ok(Pipeline::new(self.name, self.tasks)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OperationFailure, PipelineFailure};
    use crate::pipeline::operation::FnOperation;
    use crate::pipeline::task::{AnyPayload, OperationTask};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn task_returning(name: &'static str, expected_input: Payload, output: &'static str) -> impl Task {
        OperationTask::new(AnyPayload, move || {
            let expected_input = expected_input.clone();
            Ok(FnOperation::new("MockOperation", move |input| {
                if input == expected_input {
                    Ok(Payload::from(output))
                } else {
                    Err(OperationFailure::other(format!("unexpected input {}", input.type_name())))
                }
            }))
        })
        .named(name)
    }

    fn failing_task(name: &'static str) -> impl Task {
        OperationTask::new(AnyPayload, || {
            Ok(FnOperation::new("MockOperation", |_| Err(OperationFailure::other("boom"))))
        })
        .named(name)
    }

    #[test]
    fn test_run_threads_outputs() {
        let pipeline = Pipeline::builder("DummyPipeline")
            .task(task_returning("T1", Payload::Empty, "a"))
            .task(task_returning("T2", Payload::from("a"), "b"))
            .build()
            .unwrap();

        assert_eq!(pipeline.task_names(), vec!["T1", "T2"]);
        assert_eq!(pipeline.run(Payload::Empty).unwrap(), Payload::from("b"));
    }

    #[test]
    fn test_empty_pipeline_returns_input() {
        let pipeline = Pipeline::new("Empty", Vec::new());
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.run(Payload::from("x")).unwrap(), Payload::from("x"));
    }

    #[test]
    fn test_fail_fast() {
        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);
        let later = OperationTask::new(AnyPayload, move || {
            flag.store(true, Ordering::SeqCst);
            Ok(FnOperation::new("Later", Ok))
        })
        .named("T3");

        let pipeline = Pipeline::builder("DummyPipeline")
            .task(task_returning("T1", Payload::Empty, "a"))
            .task(failing_task("T2"))
            .task(later)
            .build()
            .unwrap();

        let err = pipeline.run(Payload::Empty).unwrap_err();
        assert!(!reached.load(Ordering::SeqCst));
        assert_eq!(err.pipeline_name, "DummyPipeline");
        assert_eq!(err.task_error().map(|e| e.task_name.as_str()), Some("T2"));

        let message = err.to_string().to_lowercase();
        assert!(message.contains("error running pipeline dummypipeline"));
        assert!(message.contains("error running task t2"));
        assert!(message.contains("error running operation mockoperation"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_builder_reports_first_invalid_task() {
        let err = Pipeline::builder("Broken")
            .task(task_returning("T1", Payload::Empty, "a"))
            .try_task::<OperationTask<AnyPayload>>(Err(ValidationError::new(
                "new",
                "columns",
                "empty list",
            )))
            .try_task::<OperationTask<AnyPayload>>(Err(ValidationError::new(
                "new",
                "columns",
                "second",
            )))
            .build()
            .unwrap_err();

        match &err.source {
            PipelineFailure::Definition(inner) => assert_eq!(inner.received_type, "empty list"),
            other => panic!("unexpected failure: {other}"),
        }
        assert!(err.task_error().is_none());
        assert!(err.to_string().contains("error running pipeline Broken"));
    }

    #[test]
    fn test_pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }
}
