use crate::handler::{Handler, HandlerOptions};
use crate::layer::HandlerLayer;
use std::io::Write;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Install `handler` as the global `tracing` subscriber.
///
/// **Effects**
///
/// A [`Registry`] combined with [`HandlerLayer`] becomes the global
/// default, so every `tracing` event in the process at or above the
/// handler's level is written as one text line. Fails if a global
/// subscriber was already set.
pub fn init_tracing(handler: Handler) -> Result<(), SetGlobalDefaultError> {
    let subscriber = Registry::default().with(HandlerLayer::new(handler));
    tracing::subscriber::set_global_default(subscriber)
}

/// Like [`init_tracing`], building the handler from `writer` and
/// `options`. The handler is returned so its level can be changed later.
pub fn init_tracing_with_options<W>(
    writer: W,
    options: HandlerOptions,
) -> Result<Handler, SetGlobalDefaultError>
where
    W: Write + Send + 'static,
{
    let handler = Handler::new(writer, options);
    init_tracing(handler.clone())?;
    Ok(handler)
}
