use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot {operation}: the run has already started.")]
    InvalidState { operation: &'static str },
    #[error("Worker task failed: {source}")]
    WorkerFailed {
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("Aggregator task failed: {source}")]
    AggregatorFailed {
        #[source]
        source: tokio::task::JoinError,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
