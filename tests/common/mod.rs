use hcleval::{Provider, Value};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Calls `name` with the given arguments, rendering any failure the way a
/// host would see it.
#[allow(dead_code)]
pub fn call(name: &str, args: &[Value]) -> Result<Value, String> {
    Provider::default()
        .call(name, args)
        .map_err(|e| e.to_string())
}

#[allow(dead_code)]
pub fn vars<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::object(pairs)
}
