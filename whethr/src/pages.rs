use serde::Serialize;
use tera::{Context, Tera};
use whethr_core::{HatReport, QueryParams};

use crate::error::{WebError, WebResult};

const HAT_PAGE: &str = "should_wear_a_hat.html";
const NOT_FOUND_PAGE: &str = "404.html";

/// Values to pre-fill the location form with.
#[derive(Debug, Default, Serialize)]
struct FormValues {
    lat: String,
    lon: String,
    placename: String,
}

impl From<&QueryParams> for FormValues {
    fn from(params: &QueryParams) -> Self {
        Self {
            lat: params.lat.clone().unwrap_or_default(),
            lon: params.lon.clone().unwrap_or_default(),
            placename: params
                .placename
                .clone()
                .or_else(|| params.name.clone())
                .unwrap_or_default(),
        }
    }
}

/// Compiled HTML templates.
#[derive(Debug)]
pub struct Pages {
    tera: Tera,
}

impl Pages {
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../templates/base.html")),
            (HAT_PAGE, include_str!("../templates/should_wear_a_hat.html")),
            (NOT_FOUND_PAGE, include_str!("../templates/404.html")),
        ])?;
        Ok(Self { tera })
    }

    pub fn hat(&self, report: &HatReport, params: &QueryParams) -> WebResult<String> {
        let mut context = Context::new();
        context.insert("report", report);
        context.insert("form", &FormValues::from(params));
        self.render(HAT_PAGE, &context)
    }

    pub fn not_found(&self, path: &str) -> WebResult<String> {
        let mut context = Context::new();
        context.insert("path", path);
        self.render(NOT_FOUND_PAGE, &context)
    }

    fn render(&self, template: &'static str, context: &Context) -> WebResult<String> {
        self.tera
            .render(template, context)
            .map_err(|source| WebError::Render { template, source })
    }
}
