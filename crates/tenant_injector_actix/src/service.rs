use actix_web::{
    dev::Payload,
    error::{ErrorBadRequest, ErrorInternalServerError},
    FromRequest, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::{fmt::Display, ops::Deref};
use tenant_injector::{InjectError, Injector, Request, RequestInfo, TenantError};

/// An injected request. Any request to the [`Injector`] can be injected by
/// wrapping it in this type and providing it as a parameter to your request
/// handler. The headers of the request are passed along, so tenant-aware
/// providers hand out the client of whoever sent it.
///
/// Requests that don't identify their tenant are rejected with
/// `400 Bad Request`. Any other failure results in
/// `500 Internal Server Error`.
///
/// ## Example
///
/// ```no_run
/// use actix_web::{get, App, HttpResponse, HttpServer, Responder};
/// use tenant_injector_actix::{
///     constant, define_module, Injected, Injector, Svc,
/// };
///
/// #[actix_web::main]
/// async fn main() -> std::io::Result<()> {
///     let mut builder = Injector::builder();
///     builder.add_module(define_module! {
///         services = [constant(4i32)],
///     });
///
///     let injector = builder.build();
///     HttpServer::new(move || {
///         App::new().app_data(injector.clone()).service(index)
///     })
///     .bind(("127.0.0.1", 8080))?
///     .run()
///     .await
/// }
///
/// #[get("/")]
/// async fn index(my_service: Injected<Svc<i32>>) -> impl Responder {
///     HttpResponse::Ok().body(format!("injected value is {}", *my_service))
/// }
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Injected<R>(R)
where
    R: Request;

impl<R> Injected<R>
where
    R: Request,
{
    /// Converts an [`Injected<R>`] to its inner value.
    pub fn into_inner(value: Injected<R>) -> R {
        value.0
    }
}

impl<R> Deref for Injected<R>
where
    R: Request,
{
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<R> Display for Injected<R>
where
    R: Request + Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<R> FromRequest for Injected<R>
where
    R: Request + 'static,
{
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, actix_web::Result<Self>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let injector = req.app_data::<Injector>().cloned();
        let request_info = RequestInfo::new().with_metadata(request_headers(req));

        Box::pin(async move {
            let Some(injector) = injector else {
                return Err(ErrorInternalServerError(
                    "no injector is present in app_data",
                ));
            };

            injector
                .get_with(&request_info)
                .await
                .map(Injected)
                .map_err(into_actix_error)
        })
    }
}

/// Copies the headers of an actix request into an [`http::HeaderMap`].
/// Headers that can't be represented are skipped.
fn request_headers(req: &HttpRequest) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(req.headers().len());
    for (name, value) in req.headers() {
        let name = HeaderName::from_bytes(name.as_str().as_bytes());
        let value = HeaderValue::from_bytes(value.as_bytes());
        if let (Ok(name), Ok(value)) = (name, value) {
            headers.append(name, value);
        }
    }

    headers
}

fn into_actix_error(error: InjectError) -> actix_web::Error {
    let client_error = error
        .activation_error::<TenantError>()
        .is_some_and(TenantError::is_client_error);

    if client_error {
        ErrorBadRequest(error)
    } else {
        ErrorInternalServerError(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test::TestRequest};
    use async_trait::async_trait;
    use tenant_injector::{
        constant, ClientConfig, ClientOptions, DatabaseClient, PluginConfig,
        Svc, TenantModule,
    };

    #[derive(Debug)]
    struct TestClient {
        url: Option<String>,
        refuse: bool,
    }

    #[derive(Debug, derive_more::Display, derive_more::Error)]
    #[display(fmt = "connection refused")]
    struct Refused;

    #[async_trait]
    impl DatabaseClient for TestClient {
        type Options = bool;
        type Error = Refused;

        fn new(options: ClientOptions<bool>) -> Result<Self, Refused> {
            Ok(TestClient {
                url: options.datasource_url,
                refuse: options.options,
            })
        }

        async fn connect(&self) -> Result<(), Refused> {
            if self.refuse {
                Err(Refused)
            } else {
                Ok(())
            }
        }

        async fn disconnect(&self) -> Result<(), Refused> {
            Ok(())
        }
    }

    fn injector(refuse: bool) -> Injector {
        let config =
            PluginConfig::new("USERS", ClientConfig::<TestClient>::new(refuse))
                .multitenant("postgresql://HOST:999");

        let mut builder = Injector::builder();
        builder.provide(constant(4i32));
        builder.add_module(TenantModule::register(config));
        builder.build()
    }

    async fn status_of<R: Request + 'static>(req: &HttpRequest) -> StatusCode {
        match Injected::<R>::extract(req).await {
            Ok(_) => StatusCode::OK,
            Err(error) => error.as_response_error().status_code(),
        }
    }

    #[actix_web::test]
    async fn constant_is_injected() {
        let req = TestRequest::default()
            .app_data(injector(false))
            .to_http_request();

        let value = Injected::<Svc<i32>>::extract(&req).await.unwrap();
        assert_eq!(4, **value);
    }

    #[actix_web::test]
    async fn tenant_client_is_injected() {
        let req = TestRequest::default()
            .app_data(injector(false))
            .insert_header(("X-Tenant-Id", "acme"))
            .to_http_request();

        let client = Injected::<Svc<TestClient>>::extract(&req).await.unwrap();
        assert_eq!(Some("postgresql://HOST:999/acme"), client.url.as_deref());
    }

    #[actix_web::test]
    async fn missing_tenant_is_bad_request() {
        let req = TestRequest::default()
            .app_data(injector(false))
            .to_http_request();

        assert_eq!(
            StatusCode::BAD_REQUEST,
            status_of::<Svc<TestClient>>(&req).await
        );
    }

    #[actix_web::test]
    async fn connect_failure_is_server_error() {
        let req = TestRequest::default()
            .app_data(injector(true))
            .insert_header(("x-tenant-id", "acme"))
            .to_http_request();

        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_of::<Svc<TestClient>>(&req).await
        );
    }

    #[actix_web::test]
    async fn missing_injector_is_server_error() {
        let req = TestRequest::default().to_http_request();

        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_of::<Svc<i32>>(&req).await
        );
    }

    #[test]
    fn headers_are_copied() {
        let req = TestRequest::default()
            .insert_header(("x-tenant-id", "acme"))
            .insert_header(("accept", "application/json"))
            .to_http_request();

        let headers = request_headers(&req);
        assert_eq!(2, headers.len());
        assert_eq!(
            Some("acme"),
            headers.get("x-tenant-id").and_then(|v| v.to_str().ok())
        );
    }

    #[test]
    fn other_activation_errors_are_server_errors() {
        let error = InjectError::ActivationFailed {
            service_info: tenant_injector::ServiceInfo::of::<i32>(),
            inner: Box::new(Refused),
        };
        let response = into_actix_error(error);
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            response.as_response_error().status_code()
        );
    }
}
