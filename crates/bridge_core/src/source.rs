use futures::future::LocalBoxFuture;
use url::Url;

use crate::error::SourceError;
use crate::module::NativeModule;

/// Resolves the application script text
///
/// The provider is itself a native module so the script side can query where it was
/// loaded from.
pub trait SourceProvider: NativeModule {
    fn set_script_url(&self, url: Url);

    fn script_url(&self) -> Option<Url>;

    /// Fetch the script; the future resolving is the content-ready signal
    fn load_source(&self, client: &reqwest::Client)
    -> LocalBoxFuture<'static, Result<String, SourceError>>;
}
