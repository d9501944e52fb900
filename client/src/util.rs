use wasm_bindgen::prelude::JsValue;

// Simple string error type for passing between subsystems and FFI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error(String);

impl From<Error> for JsValue {
	fn from(err: Error) -> JsValue {
		JsValue::from(&err.0)
	}
}

impl Into<String> for Error {
	fn into(self) -> String {
		self.0
	}
}

impl AsRef<str> for Error {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<JsValue> for Error {
	fn from(v: JsValue) -> Error {
		Error(match v.as_string() {
			Some(s) => s,
			None => format!("{:?}", v),
		})
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::error::Error for Error {}

macro_rules! from_display {
	($($type:ty),+) => {
		$(
			impl From<$type> for Error {
				fn from(err: $type) -> Error {
					Error(err.to_string())
				}
			}
		)+
	};
}
from_display! {
	String,
	&str,
	serde_json::error::Error
}

// Shorthand for most commonly used Result type
pub type Result<T = ()> = std::result::Result<T, Error>;

// Get JS window global
pub fn window() -> Result<web_sys::Window> {
	web_sys::window().ok_or_else(|| "window undefined".into())
}

// Get page document
pub fn document() -> Result<web_sys::Document> {
	window()?.document().ok_or_else(|| "document undefined".into())
}

// Read the content attribute of a <meta> tag by name, if any
pub fn meta_content(name: &str) -> Option<String> {
	document()
		.ok()?
		.query_selector(&format!(r#"meta[name="{}"]"#, name))
		.ok()
		.flatten()?
		.get_attribute("content")
		.filter(|s| !s.is_empty())
}

// Log any error to console
pub fn log_error_res<T, E: Into<Error>>(res: std::result::Result<T, E>) {
	if let Err(err) = res {
		log::error!("{}", err.into());
	}
}

#[test]
fn error_conversions() {
	let err: Error = "window undefined".into();
	assert_eq!(err.as_ref(), "window undefined");
	assert_eq!(err.to_string(), "window undefined");

	let parse = serde_json::from_str::<u32>("nope").unwrap_err();
	let err: Error = parse.into();
	assert!(err.as_ref().contains("expected"));

	let s: String = Error::from(String::from("bare")).into();
	assert_eq!(s, "bare");
}
