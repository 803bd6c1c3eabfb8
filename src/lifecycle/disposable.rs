//! # Disposable beans.
//!
//! Components that hold resources implement [`DisposableBean`]. A list of
//! disposables is torn down with [`destroy_all`]; a failing (or panicking)
//! disposable is handed to a [`BeanDestroyErrorHandler`] and the next one
//! still runs.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{panic_message, BoxError};

/// Bean releasing resources on destruction.
pub trait DisposableBean: Send + Sync {
    /// Releases the resources of this bean.
    fn destroy(&self) -> Result<(), BoxError>;

    /// Name used when reporting a failed destruction.
    fn bean_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Sink for errors raised while destroying beans.
pub trait BeanDestroyErrorHandler: Send + Sync {
    /// Receives the error of one bean; must not panic.
    fn catch_bean_destroy_error(&self, error: BoxError, bean_name: &str);
}

/// Default [`BeanDestroyErrorHandler`]: logs and continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDestroyErrors;

impl BeanDestroyErrorHandler for LogDestroyErrors {
    fn catch_bean_destroy_error(&self, error: BoxError, bean_name: &str) {
        tracing::error!(bean = bean_name, error = %error, "error while destroying bean");
    }
}

/// Destroys every bean in order, routing failures to `handler`.
pub fn destroy_all(beans: &[Arc<dyn DisposableBean>], handler: &dyn BeanDestroyErrorHandler) {
    for bean in beans {
        let error = match catch_unwind(AssertUnwindSafe(|| bean.destroy())) {
            Ok(Ok(())) => continue,
            Ok(Err(error)) => error,
            Err(panic) => BoxError::from(panic_message(panic.as_ref())),
        };
        handler.catch_bean_destroy_error(error, bean.bean_name());
    }
}
