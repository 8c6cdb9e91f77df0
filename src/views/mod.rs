use anyhow::Result;
use tera::{Context, Tera};

use crate::schema::{DeviceClass, DeviceClassSchema};

/// Views renders the HTML pages from templates compiled into the binary
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../../templates/base.html")),
            ("index.html", include_str!("../../templates/index.html")),
            ("device_class.html", include_str!("../../templates/device_class.html")),
        ])
        .map_err(|e| anyhow::anyhow!("Invalid page template: {}", e))?;
        Ok(Self { tera })
    }

    pub fn index(&self) -> Result<String> {
        let classes: Vec<&DeviceClassSchema> = DeviceClass::ALL.iter().map(|c| c.schema()).collect();
        let mut context = Context::new();
        context.insert("classes", &classes);
        self.render("index.html", &context)
    }

    /// Render a class page with the form and, after a submission, its texts
    pub fn device_class(
        &self,
        schema: &DeviceClassSchema,
        output: Option<&str>,
        error: Option<&str>,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("schema", schema);
        context.insert("output", &output);
        context.insert("error", &error);
        self.render("device_class.html", &context)
    }

    fn render(&self, name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(name, context)
            .map_err(|e| anyhow::anyhow!("Page rendering failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ROUTER, SWITCH};

    #[test]
    fn test_index_links_classes() {
        let html = Views::new().unwrap().index().unwrap();
        assert!(html.contains("href=\"/switches\""));
        assert!(html.contains("href=\"/routers\""));
    }

    #[test]
    fn test_form_fields_follow_schema() {
        let html = Views::new().unwrap().device_class(&ROUTER, None, None).unwrap();
        assert!(html.contains("name=\"router_0_ip\""));
        assert!(html.contains("name=\"router_0_bgp_neighbor_remote_as\""));
        assert!(html.contains("name=\"router_0_dhcp_dns\""));
        assert!(!html.contains("class=\"error\""));
    }

    #[test]
    fn test_output_and_error_are_escaped() {
        let html = Views::new()
            .unwrap()
            .device_class(&SWITCH, Some("===== SWITCH 10.0.0.1 =====\n<ok>"), Some("[10.0.0.1] failed"))
            .unwrap();
        assert!(html.contains("===== SWITCH 10.0.0.1 =====\n&lt;ok&gt;"));
        assert!(html.contains("[10.0.0.1] failed"));
    }
}
