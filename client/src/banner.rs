use crate::util;
use gloo::timers::callback::Timeout;
use wasm_bindgen::prelude::*;

/// Identifier of the banner, both for the host banner service and the
/// injected element
pub const BANNER_ID: &str = "disconnect-alert";

/// Class that starts the removal transition of the injected banner
const HIDING_CLASS: &str = "disconnect-alert-hiding";

/// Time the removal transition takes before the element is detached
const REMOVAL_DELAY_MS: u32 = 300;

/// Displays or removes the single disconnection banner.
///
/// Implementations must be idempotent: showing a visible banner or hiding an
/// absent one does nothing. An error leaves the banner as it was.
pub trait Banner {
	fn show(&mut self, message: &str) -> util::Result;
	fn hide(&mut self) -> util::Result;
}

impl<B: Banner + ?Sized> Banner for Box<B> {
	fn show(&mut self, message: &str) -> util::Result {
		(**self).show(message)
	}

	fn hide(&mut self) -> util::Result {
		(**self).hide()
	}
}

#[wasm_bindgen]
extern "C" {
	/// Plugin API object of the host application
	pub type PluginApi;

	#[wasm_bindgen(method, catch, js_name = showBanner)]
	fn show_banner(
		this: &PluginApi,
		message: &str,
		options: &JsValue,
	) -> Result<(), JsValue>;

	#[wasm_bindgen(method, catch, js_name = hideBanner)]
	fn hide_banner(this: &PluginApi, id: &str) -> Result<(), JsValue>;
}

/// Delegates to the host's banner service
pub struct HostBanner {
	api: PluginApi,
	shown: bool,
}

impl HostBanner {
	pub fn new(api: PluginApi) -> Self {
		Self { api, shown: false }
	}

	fn options() -> util::Result<JsValue> {
		let opts = js_sys::Object::new();
		for (k, v) in [
			("id", JsValue::from(BANNER_ID)),
			("type", "error".into()),
			("dismissable", false.into()),
		]
		.iter()
		{
			js_sys::Reflect::set(&opts, &(*k).into(), v)?;
		}
		Ok(opts.into())
	}
}

impl Banner for HostBanner {
	fn show(&mut self, message: &str) -> util::Result {
		if self.shown {
			return Ok(());
		}
		self.api.show_banner(message, &Self::options()?)?;
		self.shown = true;
		Ok(())
	}

	fn hide(&mut self) -> util::Result {
		if !self.shown {
			return Ok(());
		}
		self.api.hide_banner(BANNER_ID)?;
		self.shown = false;
		Ok(())
	}
}

/// Page operations the injected banner needs
pub trait Page {
	type Element;

	/// Dropping it before it fires cancels the removal
	type Removal;

	/// Find the banner element, if present
	fn find(&self) -> Option<Self::Element>;

	/// Append a new banner element displaying message
	fn insert(&self, message: &str) -> util::Result;

	/// Return, if the element is running its removal transition
	fn is_hiding(&self, el: &Self::Element) -> bool;

	fn set_hiding(&self, el: &Self::Element, hiding: bool) -> util::Result;

	/// Detach the element after the removal transition
	fn remove_later(&self, el: Self::Element) -> Self::Removal;
}

/// Banner element injected into the page directly
pub struct Injected<P: Page> {
	page: P,
	pending_removal: Option<P::Removal>,
}

impl<P: Page> Injected<P> {
	pub fn new(page: P) -> Self {
		Self {
			page,
			pending_removal: None,
		}
	}
}

impl<P: Page> Banner for Injected<P> {
	fn show(&mut self, message: &str) -> util::Result {
		match self.page.find() {
			Some(el) => {
				// Still fading out. Keep it.
				if self.page.is_hiding(&el) {
					self.pending_removal = None;
					self.page.set_hiding(&el, false)?;
				}
				Ok(())
			}
			None => {
				self.pending_removal = None;
				self.page.insert(message)
			}
		}
	}

	fn hide(&mut self) -> util::Result {
		let el = match self.page.find() {
			Some(el) => el,
			None => return Ok(()),
		};
		if self.page.is_hiding(&el) {
			return Ok(());
		}
		self.page.set_hiding(&el, true)?;
		self.pending_removal = Some(self.page.remove_later(el));
		Ok(())
	}
}

/// Current document
pub struct Document;

impl Page for Document {
	type Element = web_sys::Element;
	type Removal = Timeout;

	fn find(&self) -> Option<Self::Element> {
		util::document().ok()?.get_element_by_id(BANNER_ID)
	}

	fn insert(&self, message: &str) -> util::Result {
		let doc = util::document()?;
		let el = doc.create_element("div")?;
		el.set_id(BANNER_ID);
		el.set_class_name("banner banner-error");
		el.set_attribute("role", "alert")?;
		el.set_text_content(Some(message));
		doc.body()
			.ok_or("document has no body")?
			.append_child(&el)?;
		Ok(())
	}

	fn is_hiding(&self, el: &Self::Element) -> bool {
		el.class_list().contains(HIDING_CLASS)
	}

	fn set_hiding(&self, el: &Self::Element, hiding: bool) -> util::Result {
		let cl = el.class_list();
		if hiding {
			cl.add_1(HIDING_CLASS)?;
		} else {
			cl.remove_1(HIDING_CLASS)?;
		}
		Ok(())
	}

	fn remove_later(&self, el: Self::Element) -> Self::Removal {
		Timeout::new(REMOVAL_DELAY_MS, move || el.remove())
	}
}

/// Banner injected into the current document
pub type DomBanner = Injected<Document>;
