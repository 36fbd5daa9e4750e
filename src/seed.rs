//! # Fixture Seeding
//!
//! Imports `bootcamps.json`, `courses.json`, `users.json` and
//! `reviews.json` from a directory into the store at boot. Each file holds
//! a JSON array of documents; missing files are skipped. Bootcamps get
//! the same slug/location/defaults treatment as API-created ones, user
//! passwords are hashed, and bootcamp averages are recomputed at the end.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::bootcamps::prepare_new;
use crate::api::courses::refresh_average_cost;
use crate::api::reviews::refresh_average_rating;
use crate::api::{ApiError, BOOTCAMPS, COURSES, REVIEWS, USERS};
use crate::auth::crypto::hash_password;
use crate::auth::user::{normalize_email, PASSWORD_FIELD};
use crate::geo::Geocoder;
use crate::query::QueryPlan;
use crate::store::{id_of, DocumentStore};

/// Seeding errors
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {0}: {1}")]
    Read(String, String),

    #[error("Invalid fixture {0}: {1}")]
    Parse(String, String),

    #[error("Failed to import fixture: {0}")]
    Import(#[from] ApiError),
}

/// Number of documents imported per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub bootcamps: usize,
    pub courses: usize,
    pub users: usize,
    pub reviews: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.bootcamps + self.courses + self.users + self.reviews
    }
}

/// Read one fixture file; `None` when it does not exist
fn read_fixture(dir: &Path, file: &str) -> Result<Option<Vec<Value>>, SeedError> {
    let path = dir.join(file);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "fixture missing, skipped");
            return Ok(None);
        }
        Err(e) => return Err(SeedError::Read(path.display().to_string(), e.to_string())),
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(docs)) if docs.iter().all(Value::is_object) => Ok(Some(docs)),
        Ok(_) => Err(SeedError::Parse(
            file.to_string(),
            "expected an array of objects".to_string(),
        )),
        Err(e) => Err(SeedError::Parse(file.to_string(), e.to_string())),
    }
}

fn prepare_user(mut doc: Value) -> Result<Value, ApiError> {
    if let Some(obj) = doc.as_object_mut() {
        if let Some(email) = obj.get("email").and_then(Value::as_str) {
            let email = normalize_email(email);
            obj.insert("email".to_string(), Value::String(email));
        }
        if let Some(password) = obj.get(PASSWORD_FIELD).and_then(Value::as_str) {
            if !password.starts_with("$argon2") {
                let hash = hash_password(password)?;
                obj.insert(PASSWORD_FIELD.to_string(), Value::String(hash));
            }
        }
    }
    Ok(doc)
}

/// Import every fixture found in `dir`
pub fn import_dir(
    dir: &Path,
    store: &dyn DocumentStore,
    geocoder: &dyn Geocoder,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for mut doc in read_fixture(dir, "bootcamps.json")?.unwrap_or_default() {
        if let Some(fields) = doc.as_object_mut() {
            prepare_new(geocoder, fields)?;
        }
        store.insert(BOOTCAMPS, doc).map_err(ApiError::from)?;
        report.bootcamps += 1;
    }

    for doc in read_fixture(dir, "courses.json")?.unwrap_or_default() {
        store.insert(COURSES, doc).map_err(ApiError::from)?;
        report.courses += 1;
    }

    for doc in read_fixture(dir, "users.json")?.unwrap_or_default() {
        store
            .insert(USERS, prepare_user(doc)?)
            .map_err(ApiError::from)?;
        report.users += 1;
    }

    for doc in read_fixture(dir, "reviews.json")?.unwrap_or_default() {
        store.insert(REVIEWS, doc).map_err(ApiError::from)?;
        report.reviews += 1;
    }

    let bootcamps = store
        .execute(BOOTCAMPS, &QueryPlan::unbounded(Default::default()))
        .map_err(ApiError::from)?;
    for id in bootcamps.iter().filter_map(id_of) {
        refresh_average_cost(store, id)?;
        refresh_average_rating(store, id)?;
    }

    info!(
        dir = %dir.display(),
        bootcamps = report.bootcamps,
        courses = report.courses,
        users = report.users,
        reviews = report.reviews,
        "fixtures imported"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::verify_password;
    use crate::geo::StaticGeocoder;
    use crate::store::MemoryStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, file: &str, value: Value) {
        fs::write(dir.join(file), serde_json::to_string(&value).unwrap()).unwrap();
    }

    #[test]
    fn test_import_fixtures() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "bootcamps.json",
            json!([{
                "_id": "b1",
                "name": "Devworks Bootcamp",
                "address": "233 Bay State Rd Boston MA 02215",
                "user": "u1"
            }]),
        );
        write(
            temp.path(),
            "courses.json",
            json!([
                {"_id": "c1", "bootcamp": "b1", "tuition": 10000},
                {"_id": "c2", "bootcamp": "b1", "tuition": 12000}
            ]),
        );
        write(
            temp.path(),
            "users.json",
            json!([{"_id": "u1", "name": "P", "email": "P@Example.com", "password": "123456", "role": "publisher"}]),
        );

        let store = MemoryStore::new();
        let geocoder = StaticGeocoder::new().with_entry("02215", 42.35, -71.1);
        let report = import_dir(temp.path(), &store, &geocoder).unwrap();

        assert_eq!(
            report,
            SeedReport {
                bootcamps: 1,
                courses: 2,
                users: 1,
                reviews: 0
            }
        );
        assert_eq!(report.total(), 4);

        let bootcamp = store.find_by_id(BOOTCAMPS, "b1").unwrap().unwrap();
        assert_eq!(bootcamp["slug"], json!("devworks-bootcamp"));
        assert_eq!(bootcamp["averageCost"], json!(11000));
        assert_eq!(bootcamp["location"]["coordinates"], json!([-71.1, 42.35]));

        let user = store.find_by_id(USERS, "u1").unwrap().unwrap();
        assert_eq!(user["email"], json!("p@example.com"));
        let hash = user["password"].as_str().unwrap();
        assert!(verify_password("123456", hash).unwrap());
    }

    #[test]
    fn test_empty_dir_imports_nothing() {
        let temp = TempDir::new().unwrap();
        let report = import_dir(temp.path(), &MemoryStore::new(), &StaticGeocoder::new()).unwrap();
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_rejects_non_array_fixture() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "courses.json", json!({"not": "an array"}));
        assert!(matches!(
            import_dir(temp.path(), &MemoryStore::new(), &StaticGeocoder::new()),
            Err(SeedError::Parse(_, _))
        ));
    }
}
