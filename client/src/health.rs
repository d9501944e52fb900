use crate::{monitor::Outcome, util};
use futures::future::{FutureExt, LocalBoxFuture};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestCache, RequestCredentials, Response};

/// Server health endpoint
pub const ENDPOINT: &str = "/srv/status.json";

/// Body of a healthy response
const OK_BODY: &str = "ok";

/// Reasons a health check failed. Only used for diagnostics. All variants
/// collapse into `Outcome::Failure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
	/// Request never completed
	Transport(String),

	/// Non-success HTTP status
	Status(u16),

	/// Success status with an unexpected body
	Body(String),
}

impl std::fmt::Display for CheckError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Transport(e) => write!(f, "transport error: {}", e),
			Self::Status(s) => write!(f, "server responded with status {}", s),
			Self::Body(b) => write!(f, "unexpected response body: {:?}", b),
		}
	}
}

impl From<util::Error> for CheckError {
	fn from(e: util::Error) -> Self {
		Self::Transport(e.into())
	}
}

/// Response of the health endpoint reduced to what classification needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
	pub status: u16,
	pub body: String,
}

/// Classify a completed request
pub fn classify(
	reply: Reply,
	require_ok_body: bool,
) -> Result<(), CheckError> {
	if !(200..300).contains(&reply.status) {
		return Err(CheckError::Status(reply.status));
	}
	if require_ok_body && reply.body != OK_BODY {
		return Err(CheckError::Body(reply.body));
	}
	Ok(())
}

/// Collapse the result of a health check into an outcome
pub fn outcome(res: &Result<(), CheckError>) -> Outcome {
	match res {
		Ok(_) => Outcome::Success,
		Err(e) => {
			log::debug!("health check failed: {}", e);
			Outcome::Failure
		}
	}
}

/// Performs a single health check
pub trait Checker {
	fn check(&self) -> LocalBoxFuture<'static, Outcome>;
}

/// Queries the health endpoint of the current origin
#[derive(Clone)]
pub struct HealthCheck {
	url: String,
	require_ok_body: bool,
}

impl HealthCheck {
	pub fn new(require_ok_body: bool) -> Self {
		Self {
			url: ENDPOINT.into(),
			require_ok_body,
		}
	}

	fn request(&self) -> util::Result<Request> {
		let headers = Headers::new()?;
		headers.set("Accept", "application/json")?;

		// Token issued by the host, if any
		if let Some(token) = util::meta_content("csrf-token") {
			headers.set("X-CSRF-Token", &token)?;
		}

		let mut opts = web_sys::RequestInit::new();
		opts.method("GET")
			.credentials(RequestCredentials::SameOrigin)
			.cache(RequestCache::NoStore)
			.headers(&headers);
		Ok(Request::new_with_str_and_init(&self.url, &opts)?)
	}

	async fn fetch(self) -> util::Result<Reply> {
		let res: Response =
			JsFuture::from(util::window()?.fetch_with_request(&self.request()?))
				.await?
				.dyn_into()?;
		log::debug!("server response: {}", res.status());

		// Body is irrelevant on error statuses
		let body = if res.ok() {
			JsFuture::from(res.text()?)
				.await?
				.as_string()
				.unwrap_or_default()
		} else {
			String::new()
		};
		Ok(Reply {
			status: res.status(),
			body,
		})
	}

	async fn run(self) -> Outcome {
		let require_ok_body = self.require_ok_body;
		outcome(
			&self
				.fetch()
				.await
				.map_err(CheckError::from)
				.and_then(|r| classify(r, require_ok_body)),
		)
	}
}

impl Checker for HealthCheck {
	fn check(&self) -> LocalBoxFuture<'static, Outcome> {
		log::debug!("checking server connection");
		self.clone().run().boxed_local()
	}
}
