//! Bootcamp HTTP Routes
//!
//! CRUD, radius search and photo upload. Deleting a bootcamp removes its
//! courses and reviews.

use std::collections::HashMap;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::auth::{Role, OWNER_FIELD};
use crate::geo::{build_radius_predicate, parse_distance, Geocoder};
use crate::query::{FilterNode, Predicate, QueryPlan};
use crate::store::{id_of, DocumentStore};
use crate::uploads::{IncomingFile, UploadError};

use super::advanced::{advanced_results, Populate};
use super::documents::{optional_text, required_text, writable_fields};
use super::errors::{ApiError, ApiResult};
use super::guard::require_role;
use super::response::Envelope;
use super::server::SharedState;
use super::{BOOTCAMPS, COURSES, REVIEWS};

const NAME_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 500;

/// Headroom for multipart framing on top of the photo size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

/// Maintained by the server
const PROTECTED: [&str; 6] = [
    OWNER_FIELD,
    "slug",
    "location",
    "photo",
    "averageCost",
    "averageRating",
];

/// Create bootcamp routes
pub fn routes(max_upload: u64) -> Router<SharedState> {
    let body_limit = usize::try_from(max_upload)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/bootcamps",
            get(list_bootcamps_handler).post(create_bootcamp_handler),
        )
        .route(
            "/bootcamps/radius/:zipcode/:distance",
            get(bootcamps_in_radius_handler),
        )
        .route(
            "/bootcamps/:id",
            get(get_bootcamp_handler)
                .put(update_bootcamp_handler)
                .delete(delete_bootcamp_handler),
        )
        .route(
            "/bootcamps/:id/photo",
            put(upload_photo_handler).layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// URL-safe lowercase form of a name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Last five-digit token of a postal address
pub fn zipcode_of(address: &str) -> Option<&str> {
    address
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() == 5 && t.chars().all(|c| c.is_ascii_digit()))
        .last()
}

/// GeoJSON point for an address, when its zipcode geocodes
pub fn locate(geocoder: &dyn Geocoder, address: &str) -> ApiResult<Option<Value>> {
    let Some(zipcode) = zipcode_of(address) else {
        return Ok(None);
    };
    let location = geocoder.geocode(zipcode)?.first().map(|c| {
        json!({
            "type": "Point",
            "coordinates": [c.longitude, c.latitude],
            "formattedAddress": address,
            "zipcode": zipcode,
        })
    });
    Ok(location)
}

/// Fill in slug, location and defaults on a new bootcamp document
pub fn prepare_new(geocoder: &dyn Geocoder, fields: &mut Map<String, Value>) -> ApiResult<()> {
    if let Some(name) = fields.get("name").and_then(Value::as_str) {
        let slug = slugify(name);
        fields.insert("slug".to_string(), Value::String(slug));
    }

    if !fields.contains_key("location") {
        let address = fields.get("address").and_then(Value::as_str).map(str::to_string);
        if let Some(address) = address {
            if let Some(location) = locate(geocoder, &address)? {
                fields.insert("location".to_string(), location);
            }
        }
    }

    for (key, default) in [
        ("photo", json!("no-photo.jpg")),
        ("housing", json!(false)),
        ("jobAssistance", json!(false)),
        ("jobGuarantee", json!(false)),
        ("acceptGi", json!(false)),
    ] {
        fields.entry(key).or_insert(default);
    }
    Ok(())
}

fn validate_fields(fields: &mut Map<String, Value>) -> ApiResult<()> {
    optional_text(fields, "description", DESCRIPTION_MAX)?;
    optional_text(fields, "address", DESCRIPTION_MAX)?;

    if let Some(careers) = fields.get("careers") {
        let valid = careers.as_array().map_or(false, |items| {
            items
                .iter()
                .all(|c| c.as_str().map_or(false, |c| CAREERS.contains(&c)))
        });
        if !valid {
            return Err(ApiError::BadRequest(format!(
                "careers must be a list drawn from: {}",
                CAREERS.join(", ")
            )));
        }
    }
    Ok(())
}

fn ensure_unique_name(store: &dyn DocumentStore, name: &str, except: Option<&str>) -> ApiResult<()> {
    match store.find_one(BOOTCAMPS, &Predicate::eq("name", name))? {
        Some(existing) if id_of(&existing) != except => Err(ApiError::BadRequest(format!(
            "Duplicate field value entered: bootcamp name `{}` is taken",
            name
        ))),
        _ => Ok(()),
    }
}

fn find_bootcamp(state: &SharedState, id: &str) -> ApiResult<Value> {
    state
        .store
        .find_by_id(BOOTCAMPS, id)?
        .ok_or_else(|| ApiError::not_found("Bootcamp", id))
}

/// List bootcamps with their courses
async fn list_bootcamps_handler(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Envelope<Vec<Value>>>> {
    let result = advanced_results(state.store.as_ref(), BOOTCAMPS, &params, Populate::Courses)?;
    Ok(Json(result))
}

async fn get_bootcamp_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Value>>> {
    Ok(Json(Envelope::single(find_bootcamp(&state, &id)?)))
}

/// Create a bootcamp owned by the caller
async fn create_bootcamp_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Value>>)> {
    let principal = require_role(&state, &headers, &[Role::Publisher, Role::Admin])?;
    let Json(body) = payload?;
    let mut fields = writable_fields(body, &PROTECTED)?;

    // Non-admins may publish a single bootcamp
    let published = state
        .store
        .find_one(BOOTCAMPS, &Predicate::eq(OWNER_FIELD, principal.user_id.as_str()))?;
    if published.is_some() && !principal.is_admin() {
        return Err(ApiError::BadRequest(format!(
            "The user with ID {} has already published a bootcamp",
            principal.user_id
        )));
    }

    let name = required_text(&mut fields, "name", NAME_MAX)?;
    validate_fields(&mut fields)?;
    ensure_unique_name(state.store.as_ref(), &name, None)?;

    fields.insert(OWNER_FIELD.to_string(), Value::String(principal.user_id.clone()));
    prepare_new(state.geocoder.as_ref(), &mut fields)?;

    let bootcamp = state.store.insert(BOOTCAMPS, Value::Object(fields))?;
    info!(
        id = id_of(&bootcamp).unwrap_or_default(),
        user = %principal.user_id,
        "bootcamp created"
    );
    Ok((StatusCode::CREATED, Json(Envelope::single(bootcamp))))
}

async fn update_bootcamp_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<Value>>> {
    let principal = require_role(&state, &headers, &[Role::Publisher, Role::Admin])?;
    let bootcamp = find_bootcamp(&state, &id)?;
    principal.ensure_owner(&bootcamp, "update this bootcamp")?;

    let Json(body) = payload?;
    let mut fields = writable_fields(body, &PROTECTED)?;
    validate_fields(&mut fields)?;

    if let Some(name) = optional_text(&mut fields, "name", NAME_MAX)? {
        ensure_unique_name(state.store.as_ref(), &name, Some(&id))?;
        fields.insert("slug".to_string(), Value::String(slugify(&name)));
    }
    if let Some(address) = fields.get("address").and_then(Value::as_str).map(str::to_string) {
        if let Some(location) = locate(state.geocoder.as_ref(), &address)? {
            fields.insert("location".to_string(), location);
        }
    }

    let updated = state
        .store
        .update(BOOTCAMPS, &id, Value::Object(fields))?
        .ok_or_else(|| ApiError::not_found("Bootcamp", &id))?;
    Ok(Json(Envelope::single(updated)))
}

/// Delete a bootcamp with its courses and reviews
async fn delete_bootcamp_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Envelope<Value>>> {
    let principal = require_role(&state, &headers, &[Role::Publisher, Role::Admin])?;
    let bootcamp = find_bootcamp(&state, &id)?;
    principal.ensure_owner(&bootcamp, "delete this bootcamp")?;

    let children = Predicate::eq("bootcamp", id.as_str());
    let courses = state.store.delete_many(COURSES, &children)?;
    let reviews = state.store.delete_many(REVIEWS, &children)?;
    state.store.delete(BOOTCAMPS, &id)?;

    info!(id = %id, courses, reviews, "bootcamp deleted");
    Ok(Json(Envelope::empty()))
}

/// Bootcamps within `distance` miles of a zipcode
async fn bootcamps_in_radius_handler(
    State(state): State<SharedState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<Vec<Value>>>> {
    let miles = parse_distance(&distance)?;
    let radius = build_radius_predicate(&zipcode, miles, state.geocoder.as_ref())?;

    let plan = QueryPlan::unbounded(Predicate::new().and("location", FilterNode::GeoWithin(radius)));
    let bootcamps = state.store.execute(BOOTCAMPS, &plan)?;
    Ok(Json(Envelope::list(bootcamps)))
}

async fn upload_photo_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Envelope<String>>> {
    let principal = require_role(&state, &headers, &[Role::Publisher, Role::Admin])?;
    let bootcamp = find_bootcamp(&state, &id)?;
    principal.ensure_owner(&bootcamp, "update this bootcamp")?;

    let mut multipart = payload.map_err(|_| UploadError::MissingFile)?;
    let file = read_file_field(&mut multipart)
        .await?
        .ok_or(UploadError::MissingFile)?;

    let name = state.photos.save(&id, &file)?;
    state.store.update(BOOTCAMPS, &id, json!({ "photo": name }))?;

    info!(id = %id, photo = %name, size = file.data.len(), "bootcamp photo stored");
    Ok(Json(Envelope::single(name)))
}

/// The multipart field named `file`
async fn read_file_field(multipart: &mut Multipart) -> ApiResult<Option<IncomingFile>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await?;

        return Ok(Some(IncomingFile {
            file_name,
            content_type,
            data: data.to_vec(),
        }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::StaticGeocoder;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  ModernTech -- Bootcamp! "), "moderntech-bootcamp");
        assert_eq!(slugify("UI/UX"), "ui-ux");
    }

    #[test]
    fn test_zipcode_of() {
        assert_eq!(zipcode_of("233 Bay State Rd Boston MA 02215"), Some("02215"));
        assert_eq!(zipcode_of("45 Upper College Rd Kingston RI 02881-1234"), Some("02881"));
        assert_eq!(zipcode_of("No zip here"), None);
    }

    #[test]
    fn test_prepare_new_sets_location_and_defaults() {
        let geocoder = StaticGeocoder::new().with_entry("02215", 42.35, -71.1);
        let mut fields = json!({
            "name": "Devworks Bootcamp",
            "address": "233 Bay State Rd Boston MA 02215",
            "housing": true,
        })
        .as_object()
        .cloned()
        .unwrap();

        prepare_new(&geocoder, &mut fields).unwrap();

        assert_eq!(fields["slug"], json!("devworks-bootcamp"));
        assert_eq!(fields["location"]["coordinates"], json!([-71.1, 42.35]));
        assert_eq!(fields["location"]["zipcode"], json!("02215"));
        assert_eq!(fields["photo"], json!("no-photo.jpg"));
        assert_eq!(fields["housing"], json!(true));
        assert_eq!(fields["acceptGi"], json!(false));
    }

    #[test]
    fn test_unknown_zipcode_leaves_location_unset() {
        let mut fields = json!({"name": "X", "address": "Somewhere 99999"})
            .as_object()
            .cloned()
            .unwrap();
        prepare_new(&StaticGeocoder::new(), &mut fields).unwrap();
        assert!(!fields.contains_key("location"));
    }

    #[test]
    fn test_careers_validated() {
        let mut fields = json!({"careers": ["Web Development", "Cooking"]})
            .as_object()
            .cloned()
            .unwrap();
        assert!(validate_fields(&mut fields).is_err());
    }
}
