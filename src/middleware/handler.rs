//! Flash Middleware
//!
//! [`FlashMiddleware`] drives the flash through one request-response cycle:
//!
//! ```text
//!  on_request_start                    handler                on_request_end
//! ┌──────────────────────┐     ┌───────────────────┐     ┌──────────────────────┐
//! │ storage.load()       │     │ request.flash_mut │     │ take "flash"         │
//! │ advance() (unless    │────>│ set / keep / now  │────>│ non-empty: save()    │
//! │   static request)    │     │                   │     │ empty:     clear()   │
//! │ attach as "flash"    │     └───────────────────┘     └──────────────────────┘
//! └──────────────────────┘
//! ```
//!
//! Requests for static assets (images, stylesheets) can be exempted from the
//! `advance` step, so fetching a page's assets does not expire the messages
//! the page is about to show. Which requests count as static is decided by a
//! predicate supplied by the embedding application.

use crate::context::{InvalidFlashObject, Request, Response};
use crate::storage::{FlashStorage, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors that fail a request.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// Something other than a flash was attached under the flash attribute
    #[error(transparent)]
    InvalidFlashObject(#[from] InvalidFlashObject),

    /// The storage backend failed, including tamper detection
    #[error("flash storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Decides whether a request is for a static asset.
pub type StaticPredicate = dyn Fn(&Request) -> bool + Send + Sync;

/// Loads, ages and persists the flash around each request.
///
/// One middleware is built at startup and shared by every request.
pub struct FlashMiddleware {
    /// Where flashes are persisted between requests
    storage: Arc<dyn FlashStorage>,
    /// Skip `advance` for requests matched by `is_static`
    ignore_static: bool,
    is_static: Box<StaticPredicate>,
}

impl std::fmt::Debug for FlashMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashMiddleware")
            .field("storage", &self.storage.name())
            .field("ignore_static", &self.ignore_static)
            .finish()
    }
}

impl FlashMiddleware {
    /// Creates a middleware that persists flashes in `storage`.
    pub fn new(storage: Arc<dyn FlashStorage>) -> Self {
        Self {
            storage,
            ignore_static: false,
            is_static: Box::new(|_| false),
        }
    }

    /// Enables or disables the static-request exemption.
    pub fn ignore_static(mut self, ignore: bool) -> Self {
        self.ignore_static = ignore;
        self
    }

    /// Sets the predicate identifying static-asset requests.
    pub fn with_static_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.is_static = Box::new(predicate);
        self
    }

    pub fn storage(&self) -> &dyn FlashStorage {
        self.storage.as_ref()
    }

    /// Returns false for static requests when the exemption is enabled.
    pub fn should_advance(&self, request: &Request) -> bool {
        !(self.ignore_static && (self.is_static)(request))
    }

    /// Loads the user's flash, ages it and attaches it to `request`.
    pub fn on_request_start(&self, request: &mut Request) -> Result<(), MiddlewareError> {
        let mut flash = self.storage.load(request)?.unwrap_or_default();

        if self.should_advance(request) {
            let expired = flash.advance();
            debug!(
                path = %request.path(),
                entries = flash.len(),
                expired = expired,
                "Flash loaded"
            );
        } else {
            trace!(path = %request.path(), "Static request, flash not advanced");
        }

        request.set_flash(flash);
        Ok(())
    }

    /// Persists the request's flash, or clears the stored one if it is empty.
    pub fn on_request_end(
        &self,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<(), MiddlewareError> {
        let flash = match request.take_flash() {
            Ok(flash) => flash.unwrap_or_default(),
            Err(e) => {
                warn!(path = %request.path(), error = %e, "Refusing to persist flash");
                return Err(e.into());
            }
        };

        if flash.is_empty() {
            self.storage.clear(request, response);
        } else {
            if let Err(e) = self.storage.save(&flash, request, response) {
                warn!(path = %request.path(), error = %e, "Failed to persist flash");
                request.set_flash(flash);
                return Err(e.into());
            }
            trace!(
                path = %request.path(),
                entries = flash.len(),
                storage = self.storage.name(),
                "Flash persisted"
            );
        }

        request.set_flash(flash);
        Ok(())
    }

    /// Runs `handler` between the two hooks.
    pub fn process<F>(&self, request: &mut Request, handler: F) -> Result<Response, MiddlewareError>
    where
        F: FnOnce(&mut Request) -> Response,
    {
        self.on_request_start(request)?;
        let mut response = handler(request);
        self.on_request_end(request, &mut response)?;
        Ok(response)
    }
}

/// Wraps a view so the given flash keys survive one more request.
///
/// With no keys, the whole flash is kept. Requests without a flash are passed
/// through untouched. If something other than a flash is attached, the view
/// is not run and [`InvalidFlashObject`] is returned.
pub fn keep_messages<F, R>(
    keys: &[&str],
    view: F,
) -> impl Fn(&mut Request) -> Result<R, InvalidFlashObject>
where
    F: Fn(&mut Request) -> R,
{
    let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();

    move |request: &mut Request| {
        if let Some(flash) = request.flash_mut()? {
            flash.keep_keys(keys.as_slice());
        }
        Ok(view(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CompressedJsonCodec, JsonCodec, Signer};
    use crate::context::{template_context, Session, CONTEXT_VAR};
    use crate::scope::FlashScope;
    use crate::storage::{CookieStorage, SessionStorage};
    use serde_json::Value;

    /// A browser: carries the session and cookies from one request to the next.
    struct Client<'a> {
        middleware: &'a FlashMiddleware,
        session: Session,
        cookies: Vec<(String, String)>,
    }

    impl<'a> Client<'a> {
        fn new(middleware: &'a FlashMiddleware) -> Self {
            Self {
                middleware,
                session: Session::new(),
                cookies: Vec::new(),
            }
        }

        /// Performs a request and returns the flash the template saw.
        fn get<F>(&mut self, path: &str, view: F) -> Result<FlashScope, MiddlewareError>
        where
            F: FnOnce(&mut Request),
        {
            let mut request = Request::new(path).with_session(self.session.clone());
            for (name, value) in &self.cookies {
                request.set_cookie(name.clone(), value.clone());
            }

            let mut rendered = None;
            let response = self.middleware.process(&mut request, |request| {
                view(request);
                rendered = flash_or_default(request).ok();
                Response::ok()
            })?;

            self.session = request.session().cloned().unwrap_or_default();
            for (name, cookie) in response.cookies() {
                self.cookies.retain(|(n, _)| n != name);
                if cookie.max_age != Some(0) {
                    self.cookies.push((name.to_string(), cookie.value.clone()));
                }
            }
            Ok(rendered.unwrap_or_default())
        }
    }

    /// Returns the flash attached to `request`, or an empty one.
    fn flash_or_default(request: &Request) -> Result<FlashScope, InvalidFlashObject> {
        Ok(request.flash()?.cloned().unwrap_or_default())
    }

    fn session_middleware() -> FlashMiddleware {
        FlashMiddleware::new(Arc::new(SessionStorage::new()))
    }

    fn set_message(request: &mut Request) {
        request
            .flash_mut()
            .unwrap()
            .unwrap()
            .set("message", "Message");
    }

    fn render(_: &mut Request) {}

    fn message(flash: &FlashScope) -> Option<&Value> {
        flash.get("message").ok()
    }

    #[test]
    fn test_default_lifecycle() {
        let middleware = session_middleware();
        let mut client = Client::new(&middleware);

        let flash = client.get("/set", set_message).unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
    }

    #[test]
    fn test_keep_lifecycle() {
        let middleware = session_middleware();
        let mut client = Client::new(&middleware);

        client.get("/set", set_message).unwrap();
        let flash = client
            .get("/keep", |request| {
                request.flash_mut().unwrap().unwrap().keep("message");
            })
            .unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
    }

    #[test]
    fn test_keep_decorator() {
        let middleware = session_middleware();
        let mut client = Client::new(&middleware);
        let keep_view = keep_messages(&["message"], |_: &mut Request| ());

        client.get("/set", set_message).unwrap();
        let flash = client
            .get("/keep", |request| keep_view(request).unwrap())
            .unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
    }

    #[test]
    fn test_keep_decorator_without_keys_keeps_everything() {
        let mut request = Request::new("/");
        let mut flash = FlashScope::new();
        flash.set("a", 1);
        flash.set("b", 2);
        flash.advance();
        request.set_flash(flash);

        let view = keep_messages(&[], |request: &mut Request| {
            request.flash().unwrap().unwrap().len()
        });
        assert_eq!(view(&mut request).unwrap(), 2);

        let flash = request.flash().unwrap().unwrap();
        assert_eq!(flash.is_used("a"), Some(false));
        assert_eq!(flash.is_used("b"), Some(false));
    }

    #[test]
    fn test_keep_decorator_without_flash() {
        let mut request = Request::new("/");
        let view = keep_messages(&["message"], |_: &mut Request| "rendered");

        assert_eq!(view(&mut request).unwrap(), "rendered");
    }

    #[test]
    fn test_keep_decorator_with_invalid_object() {
        let mut request = Request::new("/");
        request.set_attribute(CONTEXT_VAR, 42i32);
        let ran = std::cell::Cell::new(false);

        let view = keep_messages(&["message"], |_: &mut Request| ran.set(true));
        let err = view(&mut request).unwrap_err();

        assert_eq!(err.attribute, CONTEXT_VAR);
        assert!(!ran.get());
    }

    #[test]
    fn test_now_lifecycle() {
        let middleware = session_middleware();
        let mut client = Client::new(&middleware);

        let flash = client
            .get("/now", |request| {
                request
                    .flash_mut()
                    .unwrap()
                    .unwrap()
                    .now()
                    .set("message", "Message");
            })
            .unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
    }

    #[test]
    fn test_discard_lifecycle() {
        let middleware = session_middleware();
        let mut client = Client::new(&middleware);

        let flash = client
            .get("/discard", |request| {
                let flash = request.flash_mut().unwrap().unwrap();
                flash.set("message", "Message");
                flash.discard("message");
            })
            .unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
    }

    #[test]
    fn test_multiple_variables_lifecycle() {
        let middleware = session_middleware();
        let mut client = Client::new(&middleware);

        client.get("/set", set_message).unwrap();
        let flash = client
            .get("/set-another", |request| {
                request
                    .flash_mut()
                    .unwrap()
                    .unwrap()
                    .set("anotherMessage", "Another message");
            })
            .unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");
        assert_eq!(flash.get("anotherMessage").unwrap(), "Another message");

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
        assert_eq!(flash.get("anotherMessage").unwrap(), "Another message");

        let flash = client.get("/", render).unwrap();
        assert!(flash.is_empty());
    }

    #[test]
    fn test_empty_flash_clears_storage() {
        let middleware = session_middleware();
        let mut client = Client::new(&middleware);

        client.get("/set", set_message).unwrap();
        assert!(client.session.contains_key("_flash_session"));

        client.get("/", render).unwrap();
        client.get("/", render).unwrap();
        assert!(!client.session.contains_key("_flash_session"));
    }

    #[test]
    fn test_remove_flash() {
        let middleware = session_middleware();
        let mut request = Request::new("/").with_session(Session::new());

        middleware.on_request_start(&mut request).unwrap();
        request.remove_attribute(CONTEXT_VAR);
        assert!(template_context(&request).unwrap().flash().is_empty());

        let mut response = Response::ok();
        middleware.on_request_end(&mut request, &mut response).unwrap();
        assert!(request.flash().unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_replace_flash_with_invalid_object() {
        let middleware = session_middleware();
        let mut client = Client::new(&middleware);

        let result = client.get("/invalid", |request| {
            request.set_attribute(CONTEXT_VAR, "Something funny".to_string());
        });
        assert!(matches!(result, Err(MiddlewareError::InvalidFlashObject(_))));
    }

    #[test]
    fn test_static_request_without_ignore() {
        let middleware = session_middleware()
            .ignore_static(false)
            .with_static_predicate(|request| request.path().starts_with("/media/"));
        let mut client = Client::new(&middleware);

        client.get("/set", set_message).unwrap();
        client.get("/media/test.css", render).unwrap();

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
    }

    #[test]
    fn test_static_request_with_ignore() {
        let middleware = session_middleware()
            .ignore_static(true)
            .with_static_predicate(|request| request.path().starts_with("/media/"));
        let mut client = Client::new(&middleware);

        client.get("/set", set_message).unwrap();
        let flash = client.get("/media/test.css", render).unwrap();
        assert_eq!(flash.is_used("message"), Some(false));

        let flash = client.get("/", render).unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
    }

    #[test]
    fn test_should_advance() {
        let middleware = session_middleware()
            .ignore_static(true)
            .with_static_predicate(|request| request.path().ends_with(".png"));

        assert!(!middleware.should_advance(&Request::new("/logo.png")));
        assert!(middleware.should_advance(&Request::new("/")));
        assert!(session_middleware().should_advance(&Request::new("/logo.png")));
    }

    #[test]
    fn test_cookie_lifecycle() {
        let signer = Signer::new(Arc::new(CompressedJsonCodec::new()), "secret").unwrap();
        let middleware = FlashMiddleware::new(Arc::new(CookieStorage::new(signer)));
        let mut client = Client::new(&middleware);

        client.get("/set", set_message).unwrap();
        assert_eq!(client.cookies.len(), 1);

        let flash = client.get("/", render).unwrap();
        assert_eq!(message(&flash).unwrap(), "Message");

        let flash = client.get("/", render).unwrap();
        assert!(!flash.contains("message"));
        assert!(client.cookies.is_empty());
    }

    #[test]
    fn test_tampered_cookie_fails_request() {
        let signer = Signer::new(Arc::new(JsonCodec), "secret").unwrap();
        let middleware = FlashMiddleware::new(Arc::new(CookieStorage::new(signer)));
        let mut client = Client::new(&middleware);

        client.get("/set", set_message).unwrap();
        let (_, value) = &mut client.cookies[0];
        value.replace_range(0..4, "AAAA");

        let err = client.get("/", render).unwrap_err();
        match err {
            MiddlewareError::Storage(e) => assert!(e.is_tampering()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_storage_failure() {
        struct Unavailable;

        impl FlashStorage for Unavailable {
            fn name(&self) -> &'static str {
                "unavailable"
            }

            fn load(&self, _: &Request) -> Result<Option<FlashScope>, StorageError> {
                Err(anyhow::anyhow!("backend offline").into())
            }

            fn save(
                &self,
                _: &FlashScope,
                _: &mut Request,
                _: &mut Response,
            ) -> Result<(), StorageError> {
                Ok(())
            }

            fn clear(&self, _: &mut Request, _: &mut Response) {}
        }

        let middleware = FlashMiddleware::new(Arc::new(Unavailable));
        let err = middleware
            .on_request_start(&mut Request::new("/"))
            .unwrap_err();
        assert_eq!(err.to_string(), "flash storage error: backend offline");
    }

    #[test]
    fn test_failed_save_keeps_flash_attached() {
        struct ReadOnly;

        impl FlashStorage for ReadOnly {
            fn name(&self) -> &'static str {
                "read-only"
            }

            fn load(&self, _: &Request) -> Result<Option<FlashScope>, StorageError> {
                Ok(None)
            }

            fn save(
                &self,
                _: &FlashScope,
                _: &mut Request,
                _: &mut Response,
            ) -> Result<(), StorageError> {
                Err(anyhow::anyhow!("storage is read-only").into())
            }

            fn clear(&self, _: &mut Request, _: &mut Response) {}
        }

        let middleware = FlashMiddleware::new(Arc::new(ReadOnly));
        let mut request = Request::new("/");
        middleware.on_request_start(&mut request).unwrap();
        request
            .flash_mut()
            .unwrap()
            .unwrap()
            .set("message", "Message");

        let mut response = Response::ok();
        let err = middleware
            .on_request_end(&mut request, &mut response)
            .unwrap_err();
        assert!(matches!(err, MiddlewareError::Storage(_)));

        let flash = request.flash().unwrap().unwrap();
        assert_eq!(flash.get("message").unwrap(), "Message");
    }
}
