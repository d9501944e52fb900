use crate::util;
use serde::Deserialize;
use wasm_bindgen::JsValue;

/// ID of the element carrying inline JSON settings, when the host embeds them
/// in the page instead of passing them to `start`
const INLINE_SETTINGS_ID: &str = "disconnect-alert-settings";

/// Shown, when the host does not configure a message
pub const DEFAULT_MESSAGE: &str =
	"Cannot connect to the server. Please check your internet connection.";

/// Site settings exposed to the plugin by the host application.
///
/// Field names match the host's setting keys.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
	/// Run the connectivity monitor at all
	pub disconnect_alert_enabled: bool,

	/// Milliseconds between health checks
	pub disconnect_alert_ping_interval: u32,

	/// Text displayed in the banner
	pub disconnect_alert_message: String,

	/// Treat a successful response as healthy only, if its body is `ok`
	pub disconnect_alert_require_ok_body: bool,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			disconnect_alert_enabled: false,
			disconnect_alert_ping_interval: 10_000,
			disconnect_alert_message: DEFAULT_MESSAGE.into(),
			disconnect_alert_require_ok_body: true,
		}
	}
}

/// Validated monitor configuration. Immutable for the page's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub enabled: bool,
	pub ping_interval_ms: u32,
	pub message: String,
	pub require_ok_body: bool,
}

impl Settings {
	/// Parse settings from a JSON document
	pub fn from_json(s: &str) -> util::Result<Self> {
		Ok(serde_json::from_str(s)?)
	}

	/// Read settings from a plain JS object passed by the host
	pub fn from_js(v: &JsValue) -> util::Result<Self> {
		if v.is_undefined() || v.is_null() {
			return Ok(Default::default());
		}
		Self::from_json(&String::from(js_sys::JSON::stringify(v)?))
	}

	/// Read settings from JSON embedded in the HTML
	pub fn from_page() -> util::Result<Self> {
		Self::from_json(
			&util::document()?
				.get_element_by_id(INLINE_SETTINGS_ID)
				.ok_or("inline disconnect alert settings not found")?
				.text_content()
				.unwrap_or_default(),
		)
	}

	/// Validate settings and convert them into a monitor configuration
	pub fn into_config(self) -> util::Result<Config> {
		if self.disconnect_alert_ping_interval == 0 {
			return Err("disconnect_alert_ping_interval must be positive".into());
		}

		let message = self.disconnect_alert_message.trim();
		Ok(Config {
			enabled: self.disconnect_alert_enabled,
			ping_interval_ms: self.disconnect_alert_ping_interval,
			message: if message.is_empty() {
				DEFAULT_MESSAGE.into()
			} else {
				message.into()
			},
			require_ok_body: self.disconnect_alert_require_ok_body,
		})
	}
}
