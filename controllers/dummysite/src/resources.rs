//! Object templates for a site's derived resources.
//!
//! A site named `blog` owns ConfigMap `blog-html`, Pod `blog-pod` and
//! Service `blog-service`. The Pod mounts the ConfigMap as the web server's
//! document root and the Service selects the Pod through its `app` label.

use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, Pod, PodSpec, Service, ServicePort,
    ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use site_fetcher::SiteContent;
use std::collections::BTreeMap;

/// Data key holding the fetched page
pub const HTML_KEY: &str = "index.html";
/// Label tying the Pod to its Service
pub const APP_LABEL: &str = "app";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "dummysite-controller";
pub const SOURCE_URL_ANNOTATION: &str = "dummysite.example.com/source-url";
pub const FETCHED_AT_ANNOTATION: &str = "dummysite.example.com/fetched-at";
/// Port the web server listens on and the Service exposes
pub const HTTP_PORT: i32 = 80;

const SERVER_CONTAINER: &str = "nginx";
const HTML_VOLUME: &str = "html";
const DOCUMENT_ROOT: &str = "/usr/share/nginx/html";

pub fn html_config_map_name(site: &str) -> String {
    format!("{}-html", site)
}

pub fn pod_name(site: &str) -> String {
    format!("{}-pod", site)
}

pub fn service_name(site: &str) -> String {
    format!("{}-service", site)
}

/// Selector labels shared by the Pod and the Service.
pub fn selector_labels(site: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), site.to_string())])
}

fn object_labels(site: &str) -> BTreeMap<String, String> {
    let mut labels = selector_labels(site);
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
    labels
}

/// ConfigMap carrying the fetched page under `index.html`.
///
/// Bodies that are not valid UTF-8 go to `binaryData` since `data` only
/// holds strings.
pub fn build_config_map(site: &str, content: &SiteContent, fetched_at: DateTime<Utc>) -> ConfigMap {
    let annotations = BTreeMap::from([
        (SOURCE_URL_ANNOTATION.to_string(), content.url.clone()),
        (
            FETCHED_AT_ANNOTATION.to_string(),
            fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
    ]);

    let (data, binary_data) = match content.as_utf8() {
        Some(html) => (
            Some(BTreeMap::from([(HTML_KEY.to_string(), html.to_string())])),
            None,
        ),
        None => (
            None,
            Some(BTreeMap::from([(
                HTML_KEY.to_string(),
                ByteString(content.body.clone()),
            )])),
        ),
    };

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(html_config_map_name(site)),
            labels: Some(object_labels(site)),
            annotations: Some(annotations),
            ..Default::default()
        },
        data,
        binary_data,
        ..Default::default()
    }
}

/// Pod serving the ConfigMap contents with a static file server.
pub fn build_pod(site: &str, image: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(pod_name(site)),
            labels: Some(object_labels(site)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: SERVER_CONTAINER.to_string(),
                image: Some(image.to_string()),
                ports: Some(vec![ContainerPort {
                    name: Some("http".to_string()),
                    container_port: HTTP_PORT,
                    ..Default::default()
                }]),
                volume_mounts: Some(vec![VolumeMount {
                    name: HTML_VOLUME.to_string(),
                    mount_path: DOCUMENT_ROOT.to_string(),
                    read_only: Some(true),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: HTML_VOLUME.to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: html_config_map_name(site),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Service exposing the site Pod on port 80.
pub fn build_service(site: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(service_name(site)),
            labels: Some(object_labels(site)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(site)),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                protocol: Some("TCP".to_string()),
                port: HTTP_PORT,
                target_port: Some(IntOrString::Int(HTTP_PORT)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_derived_names() {
        assert_eq!(html_config_map_name("blog"), "blog-html");
        assert_eq!(pod_name("blog"), "blog-pod");
        assert_eq!(service_name("blog"), "blog-service");
    }

    #[test]
    fn test_config_map_holds_html_under_index_key() {
        let content = SiteContent::new("http://example.test/page", "<html>hi</html>");
        let cm = build_config_map("blog", &content, fetched_at());

        assert_eq!(cm.metadata.name.as_deref(), Some("blog-html"));
        let data = cm.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("index.html").map(String::as_str), Some("<html>hi</html>"));
        assert!(cm.binary_data.is_none());

        let annotations = cm.metadata.annotations.unwrap();
        assert_eq!(
            annotations.get(SOURCE_URL_ANNOTATION).map(String::as_str),
            Some("http://example.test/page")
        );
        assert_eq!(
            annotations.get(FETCHED_AT_ANNOTATION).map(String::as_str),
            Some("2026-10-19T12:00:00Z")
        );
    }

    #[test]
    fn test_config_map_uses_binary_data_for_non_utf8_body() {
        let content = SiteContent::new("http://example.test/logo", vec![0xff, 0xfe, 0x00]);
        let cm = build_config_map("blog", &content, fetched_at());

        assert!(cm.data.is_none());
        let binary = cm.binary_data.unwrap();
        assert_eq!(binary.get("index.html"), Some(&ByteString(vec![0xff, 0xfe, 0x00])));
    }

    #[test]
    fn test_pod_mounts_config_map_at_document_root() {
        let pod = build_pod("blog", "nginx:alpine");

        assert_eq!(pod.metadata.name.as_deref(), Some("blog-pod"));
        let labels = pod.metadata.labels.unwrap();
        assert_eq!(labels.get("app").map(String::as_str), Some("blog"));

        let spec = pod.spec.unwrap();
        assert_eq!(spec.containers.len(), 1);
        let container = &spec.containers[0];
        assert_eq!(container.image.as_deref(), Some("nginx:alpine"));
        let mounts = container.volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].name, "html");
        assert_eq!(mounts[0].mount_path, "/usr/share/nginx/html");

        let volumes = spec.volumes.unwrap();
        assert_eq!(volumes[0].name, "html");
        assert_eq!(volumes[0].config_map.as_ref().unwrap().name, "blog-html");
    }

    #[test]
    fn test_service_selects_app_label_on_port_80() {
        let service = build_service("blog");

        assert_eq!(service.metadata.name.as_deref(), Some("blog-service"));
        let spec = service.spec.unwrap();
        assert_eq!(spec.selector, Some(selector_labels("blog")));
        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 80);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(80)));
    }
}
