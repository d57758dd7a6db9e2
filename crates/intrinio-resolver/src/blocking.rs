use intrinio_core::{CellValue, IntrinioError, IntrinioResult};
use std::future::Future;
use tokio::runtime::{Builder, Runtime};

use crate::functions::IntrinioFunctions;

/// Synchronous entry point for hosts that call from their own threads.
pub struct BlockingFunctions {
    runtime: Runtime,
    functions: IntrinioFunctions,
}

impl BlockingFunctions {
    pub fn new(functions: IntrinioFunctions) -> IntrinioResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("intrinio-worker")
            .enable_all()
            .build()
            .map_err(|e| IntrinioError::Config(format!("failed to start runtime: {}", e)))?;
        Ok(Self { runtime, functions })
    }

    pub fn functions(&self) -> &IntrinioFunctions {
        &self.functions
    }

    /// Run one function call to completion on the calling thread.
    ///
    /// Must not be called from inside an async context.
    pub fn call<'a, F, Fut>(&'a self, f: F) -> CellValue
    where
        F: FnOnce(&'a IntrinioFunctions) -> Fut,
        Fut: Future<Output = CellValue> + 'a,
    {
        self.runtime.block_on(f(&self.functions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ConfigurationGate;
    use crate::resolver::IntrinioResolver;
    use crate::testing::{page_body, FakeApi};
    use intrinio_core::CredentialStore;
    use serde_json::json;
    use std::sync::Arc;

    struct Configured;

    impl CredentialStore for Configured {
        fn is_configured(&self) -> bool {
            true
        }

        fn save(&self, _username: &str, _password: &str) -> IntrinioResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_calls_from_host_threads() {
        let api = FakeApi::new();
        api.on(
            "/prices",
            &[("identifier", "$SPX")],
            200,
            page_body(vec![json!({"close": 2238.83}), json!({"close": 2263.79})], 1),
        );
        let functions = IntrinioFunctions::new(
            IntrinioResolver::new(api.clone()),
            ConfigurationGate::new(Arc::new(Configured)),
        );
        let blocking = BlockingFunctions::new(functions).unwrap();
        let filter = crate::market::HistoryFilter::new();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let value =
                        blocking.call(|f| f.historical_prices("$SPX", "close", 1, &filter));
                    assert_eq!(value, CellValue::Number(2263.79));
                });
            }
        });

        assert!(api.calls_to("/prices") >= 1);
        assert_eq!(
            blocking.call(|f| f.historical_prices("$SPX", "close", 0, &filter)),
            CellValue::Number(2238.83)
        );
    }
}
