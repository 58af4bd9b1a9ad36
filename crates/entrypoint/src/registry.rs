use crate::dispatch::Invocation;
use crate::error::SubtaskDiscoveryError;
use gdino_shared::ErrorEnvelope;
use std::fmt;

/// Final status of a subtask run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtaskOutcome {
    /// Process-style exit code; zero means success.
    pub exit_code: i32,
}

impl SubtaskOutcome {
    /// Successful run.
    pub const SUCCESS: Self = Self { exit_code: 0 };

    /// Outcome with an explicit exit code.
    #[must_use]
    pub const fn exited(exit_code: i32) -> Self {
        Self { exit_code }
    }

    /// True when the exit code is zero.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.exit_code == 0
    }
}

/// A named unit of work selectable from the command line.
pub trait Subtask: Send + Sync {
    /// Name used on the command line.
    fn name(&self) -> &str;

    /// One-line description shown in help output.
    fn summary(&self) -> &str {
        ""
    }

    /// Run the subtask. Errors are reported as-is by the dispatcher.
    fn run(&self, invocation: &Invocation) -> Result<SubtaskOutcome, ErrorEnvelope>;
}

type Handler = Box<dyn Fn(&Invocation) -> Result<SubtaskOutcome, ErrorEnvelope> + Send + Sync>;

/// In-process subtask backed by a closure.
pub struct FnSubtask {
    name: Box<str>,
    summary: Box<str>,
    handler: Handler,
}

impl FnSubtask {
    /// Wrap `handler` under `name`.
    pub fn new<F>(name: impl Into<Box<str>>, summary: impl Into<Box<str>>, handler: F) -> Self
    where
        F: Fn(&Invocation) -> Result<SubtaskOutcome, ErrorEnvelope> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            summary: summary.into(),
            handler: Box::new(handler),
        }
    }
}

impl fmt::Debug for FnSubtask {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FnSubtask")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl Subtask for FnSubtask {
    fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self) -> &str {
        &self.summary
    }

    fn run(&self, invocation: &Invocation) -> Result<SubtaskOutcome, ErrorEnvelope> {
        (self.handler)(invocation)
    }
}

/// Immutable set of subtasks for one network, in registration order.
pub struct SubtaskRegistry {
    namespace: Box<str>,
    subtasks: Vec<Box<dyn Subtask>>,
}

impl SubtaskRegistry {
    /// Start registering subtasks under `namespace`.
    pub fn builder(namespace: impl Into<Box<str>>) -> SubtaskRegistryBuilder {
        SubtaskRegistryBuilder {
            namespace: namespace.into(),
            subtasks: Vec::new(),
        }
    }

    /// Registry namespace (the network name).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Subtask by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Subtask> {
        self.subtasks
            .iter()
            .find(|subtask| subtask.name() == name)
            .map(|subtask| &**subtask)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subtasks.iter().map(|subtask| subtask.name())
    }

    /// Registered subtasks in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Subtask> {
        self.subtasks.iter().map(|subtask| &**subtask)
    }

    /// Number of subtasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subtasks.len()
    }

    /// Always false for a built registry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subtasks.is_empty()
    }
}

impl fmt::Debug for SubtaskRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SubtaskRegistry")
            .field("namespace", &self.namespace)
            .field("subtasks", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`SubtaskRegistry`].
pub struct SubtaskRegistryBuilder {
    namespace: Box<str>,
    subtasks: Vec<Box<dyn Subtask>>,
}

impl SubtaskRegistryBuilder {
    /// Register a subtask.
    #[must_use]
    pub fn register(mut self, subtask: impl Subtask + 'static) -> Self {
        self.subtasks.push(Box::new(subtask));
        self
    }

    /// Freeze the registry, rejecting empty sets and duplicate names.
    pub fn build(self) -> Result<SubtaskRegistry, SubtaskDiscoveryError> {
        if self.subtasks.is_empty() {
            return Err(SubtaskDiscoveryError::Empty {
                namespace: self.namespace.into(),
            });
        }

        for (idx, subtask) in self.subtasks.iter().enumerate() {
            let name = subtask.name();
            let seen_before = self
                .subtasks
                .iter()
                .take(idx)
                .any(|earlier| earlier.name() == name);
            if seen_before {
                return Err(SubtaskDiscoveryError::Duplicate {
                    namespace: self.namespace.into(),
                    name: name.to_owned(),
                });
            }
        }

        tracing::debug!(
            namespace = %self.namespace,
            count = self.subtasks.len(),
            "subtask registry built"
        );
        Ok(SubtaskRegistry {
            namespace: self.namespace,
            subtasks: self.subtasks,
        })
    }
}
