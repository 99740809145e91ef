use std::sync::LazyLock;
use std::time::Duration;

use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::{PageSnapshot, Transport};
use crate::config::{FormField, Settings};
use crate::error::{ConfigurationError, TransportError};
use crate::parser;

const NEXT_BUTTON: &str = "fwListNaviBtnNext";

static NEXT_CONTROL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(&format!("[name={}]", NEXT_BUTTON)).unwrap());
static FORM_CONTROL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name], select[name], textarea[name]").unwrap());
static OPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub form_selector: String,
    pub search_button: String,
    pub search_fields: Vec<FormField>,
}

impl HttpOptions {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            user_agent: s.user_agent.clone(),
            timeout: s.page_load_timeout(),
            form_selector: s.search_form_selector.clone(),
            search_button: s.search_button.clone(),
            search_fields: s.search_fields.clone(),
        }
    }
}

/// A form ready to be posted: resolved action plus fields in document order.
#[derive(Debug, Clone)]
pub struct FormSubmission {
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, name: &str, value: &str) {
        self.fields.retain(|(k, _)| k != name);
        self.fields.push((name.to_string(), value.to_string()));
    }
}

/// Replays the site's search form over plain HTTP, keeping the session cookie,
/// then follows the "next" submit button page by page.
pub struct HttpTransport {
    client: Client,
    opts: HttpOptions,
    current: Option<PageSnapshot>,
    closed: bool,
}

impl HttpTransport {
    pub fn new(opts: HttpOptions) -> Result<Self, TransportError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(opts.timeout)
            .user_agent(opts.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            opts,
            current: None,
            closed: false,
        })
    }

    async fn submit(&mut self, form: FormSubmission) -> Result<PageSnapshot, TransportError> {
        debug!(action = %form.action, fields = form.fields.len(), "Submitting form");
        let resp = self
            .client
            .post(form.action)
            .form(&form.fields)
            .send()
            .await?
            .error_for_status()?;
        let url = resp.url().to_string();
        let markup = resp.text().await?;
        let page = PageSnapshot { markup, url };
        self.current = Some(page.clone());
        Ok(page)
    }
}

impl Transport for HttpTransport {
    async fn fetch_initial(&mut self, url: &str) -> Result<PageSnapshot, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        info!("Opening search page: {}", url);
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let landed = resp.url().to_string();
        let markup = resp.text().await?;

        let form = search_submission(
            &markup,
            &landed,
            &self.opts.form_selector,
            &self.opts.search_button,
            &self.opts.search_fields,
        )?;
        self.submit(form).await
    }

    async fn page_ready(&mut self, _timeout: Duration) -> bool {
        // The client timeout already bounds the response; a complete body
        // either carries the markers or never will.
        self.current
            .as_ref()
            .is_some_and(|p| parser::is_ready(&p.markup))
    }

    async fn has_next_page(&mut self) -> bool {
        !self.closed
            && self
                .current
                .as_ref()
                .is_some_and(|p| has_enabled_next(&p.markup))
    }

    async fn advance(&mut self) -> Result<PageSnapshot, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let page = self.current.as_ref().ok_or_else(|| TransportError::NoNextPage {
            url: String::new(),
        })?;
        let form = next_submission(&page.markup, &page.url).ok_or_else(|| {
            TransportError::NoNextPage {
                url: page.url.clone(),
            }
        })?;
        self.submit(form).await
    }

    async fn close(&mut self) {
        self.closed = true;
        self.current = None;
    }
}

/// Build the search request from the landing page: every field the form
/// already carries, then the configured overrides, then the search button.
pub fn search_submission(
    markup: &str,
    page_url: &str,
    form_css: &str,
    button: &str,
    overrides: &[FormField],
) -> Result<FormSubmission, ConfigurationError> {
    let form_sel =
        Selector::parse(form_css).map_err(|_| ConfigurationError::BadSelector(form_css.into()))?;
    let doc = Html::parse_document(markup);
    let form = doc
        .select(&form_sel)
        .next()
        .ok_or_else(|| ConfigurationError::SearchFormMissing {
            selector: form_css.to_string(),
            url: page_url.to_string(),
        })?;

    let mut sub = FormSubmission {
        action: form_action(form, page_url)?,
        fields: form_fields(form),
    };
    for f in overrides {
        sub.set(&f.name, &f.value);
    }
    let label = form
        .select(&FORM_CONTROL)
        .find(|e| e.value().attr("name") == Some(button))
        .and_then(|e| e.value().attr("value"))
        .unwrap_or_default();
    sub.set(button, label);
    Ok(sub)
}

/// Whether the page carries a next control that is not disabled.
pub fn has_enabled_next(markup: &str) -> bool {
    let doc = Html::parse_document(markup);
    let found = doc.select(&NEXT_CONTROL).any(|e| !is_disabled(e));
    found
}

/// The submission the enabled next control would send, if there is one.
pub fn next_submission(markup: &str, page_url: &str) -> Option<FormSubmission> {
    let doc = Html::parse_document(markup);
    let button = doc.select(&NEXT_CONTROL).find(|e| !is_disabled(*e))?;
    let form = button
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "form")?;

    let mut fields = form_fields(form);
    fields.push((
        NEXT_BUTTON.to_string(),
        button.value().attr("value").unwrap_or_default().to_string(),
    ));
    let action = form_action(form, page_url).ok()?;
    Some(FormSubmission { action, fields })
}

fn is_disabled(e: ElementRef) -> bool {
    e.value().attr("disabled").is_some() || e.value().classes().any(|c| c == "disabled")
}

fn form_action(form: ElementRef, page_url: &str) -> Result<Url, ConfigurationError> {
    let bad = |reason: String| ConfigurationError::BadUrl {
        url: page_url.to_string(),
        reason,
    };
    let base = Url::parse(page_url).map_err(|e| bad(e.to_string()))?;
    base.join(form.value().attr("action").unwrap_or_default())
        .map_err(|e| bad(e.to_string()))
}

/// Successful controls of a form, as a browser would serialize them.
/// Submit-type inputs are left out; the caller adds the one it clicks.
fn form_fields(form: ElementRef) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for el in form.select(&FORM_CONTROL) {
        let v = el.value();
        if v.attr("disabled").is_some() {
            continue;
        }
        let Some(name) = v.attr("name") else { continue };
        match v.name() {
            "input" => {
                let kind = v.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "button" | "image" | "reset" | "file" => {}
                    "checkbox" | "radio" => {
                        if v.attr("checked").is_some() {
                            fields.push((name.into(), v.attr("value").unwrap_or("on").into()));
                        }
                    }
                    _ => fields.push((name.into(), v.attr("value").unwrap_or_default().into())),
                }
            }
            "select" => {
                let options: Vec<ElementRef> = el.select(&OPTION).collect();
                let mut chosen: Vec<ElementRef> = options
                    .iter()
                    .copied()
                    .filter(|o| o.value().attr("selected").is_some())
                    .collect();
                if chosen.is_empty() && v.attr("multiple").is_none() {
                    chosen.extend(options.first().copied());
                }
                for o in chosen {
                    let value = match o.value().attr("value") {
                        Some(val) => val.to_string(),
                        None => o.text().collect::<String>().trim().to_string(),
                    };
                    fields.push((name.into(), value));
                }
            }
            _ => fields.push((name.into(), el.text().collect())),
        }
    }
    fields
}

// ── Tests ──
