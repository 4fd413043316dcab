use super::handlers::{health, replay};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Router that also drives the `OpenAPI` document.
///
/// Routes added outside (like `OPTIONS /health`) are not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(replay::check))
        .routes(routes!(replay::reset));

    let mut replay_tag = Tag::new("replay");
    replay_tag.description = Some("One-time code replay checks and farm-wide reset".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Node status".to_string());

    router.get_openapi_mut().tags = Some(vec![replay_tag, health_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // "Name <email>"; only the first author is used.
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    let (name, email) = match primary.split_once('<') {
        Some((name, email)) => (name.trim(), email.trim_end_matches('>').trim()),
        None => (primary, ""),
    };
    if name.is_empty() && email.is_empty() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = (!name.is_empty()).then(|| name.to_string());
    contact.email = (!email.is_empty()).then(|| email.to_string());
    Some(contact)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
