use std::path::Path;

use crate::config::PublicUrlConfig;
use crate::render::image_file_name;

/// Route under which rendered images are served.
pub const ATTACHMENTS_ROUTE: &str = "public/img/attachments";

impl PublicUrlConfig {
    /// Host part of public links. A wildcard bind address is not routable, so
    /// it is published as `localhost`.
    pub fn domain(&self) -> &str {
        if self.http_addr == "0.0.0.0" {
            "localhost"
        } else {
            &self.http_addr
        }
    }

    fn origin(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.domain(), self.http_port)
    }

    fn sub_path(&self) -> &str {
        if self.serve_from_sub_path {
            self.app_sub_url.trim_end_matches('/')
        } else {
            ""
        }
    }

    /// Public URL of a rendered image. A configured renderer callback URL takes
    /// precedence over the locally composed origin.
    pub fn image_url(&self, image_name: &str) -> String {
        if let Some(callback_url) = self.renderer_callback_url.as_deref() {
            let base = callback_url.trim_end_matches('/');
            return format!("{base}/{ATTACHMENTS_ROUTE}/{image_name}");
        }

        format!("{}{}/{ATTACHMENTS_ROUTE}/{image_name}", self.origin(), self.sub_path())
    }

    /// Public image URL for a file produced by the renderer.
    pub fn image_url_for_file(&self, file_path: &Path) -> Option<String> {
        image_file_name(file_path).map(|name| self.image_url(name))
    }

    /// Absolute link to a dashboard route supplied by the UI.
    pub fn dashboard_link(&self, dashboard_path: &str) -> String {
        if dashboard_path.is_empty() || dashboard_path.starts_with('/') {
            format!("{}{dashboard_path}", self.origin())
        } else {
            format!("{}/{dashboard_path}", self.origin())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::config::{Protocol, PublicUrlConfig};

    fn public_url() -> PublicUrlConfig {
        PublicUrlConfig {
            protocol: Protocol::Http,
            http_addr: "0.0.0.0".to_string(),
            http_port: 3000,
            app_sub_url: "/grafana".to_string(),
            serve_from_sub_path: false,
            renderer_callback_url: None,
        }
    }

    #[test]
    fn image_url_is_composed_from_local_origin() {
        let url = public_url().image_url("abc.png");

        assert_eq!(url, "http://localhost:3000/public/img/attachments/abc.png");
    }

    #[test]
    fn image_url_includes_sub_path_when_served_from_it() {
        let mut config = public_url();
        config.serve_from_sub_path = true;
        config.protocol = Protocol::H2;
        config.http_addr = "grafana.internal".to_string();

        assert_eq!(
            config.image_url("abc.png"),
            "https://grafana.internal:3000/grafana/public/img/attachments/abc.png"
        );
    }

    #[test]
    fn callback_url_takes_precedence() {
        let mut config = public_url();
        config.renderer_callback_url = Some("https://grafana.example.com/".to_string());

        assert_eq!(
            config.image_url("abc.png"),
            "https://grafana.example.com/public/img/attachments/abc.png"
        );
    }

    #[test]
    fn image_url_for_file_uses_base_name_deterministically() {
        let config = public_url();
        let path = Path::new("/var/lib/grafana/png/Zq81xk.png");

        let first = config.image_url_for_file(path);
        let second = config.image_url_for_file(path);

        assert_eq!(
            first.as_deref(),
            Some("http://localhost:3000/public/img/attachments/Zq81xk.png")
        );
        assert_eq!(first, second);
    }

    #[test]
    fn dashboard_link_appends_path_to_origin() {
        let config = public_url();

        assert_eq!(
            config.dashboard_link("/d/abc/slug?orgId=1"),
            "http://localhost:3000/d/abc/slug?orgId=1"
        );
        assert_eq!(config.dashboard_link("d/abc/slug"), "http://localhost:3000/d/abc/slug");
    }
}
