//! Theaters: the venues sessions take place in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  geo::GeoPoint,
  media::validate_base64_image,
  slug::{slugify, validate_slug},
};

// ─── Address & contacts ──────────────────────────────────────────────────────

/// A postal address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
  pub street:       String,
  pub number:       Option<String>,
  pub neighborhood: Option<String>,
  pub city:         String,
  /// State or province code, e.g. `"SP"`.
  pub state:        String,
  pub postal_code:  Option<String>,
  /// ISO 3166-1 alpha-2 country code.
  #[serde(default = "default_country")]
  pub country:      String,
}

fn default_country() -> String { "BR".to_owned() }

impl Address {
  pub fn validate(&self) -> Result<()> {
    for (field, value) in [
      ("address.street", &self.street),
      ("address.city", &self.city),
      ("address.state", &self.state),
    ] {
      if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} must not be blank")));
      }
    }
    if self.country.len() != 2
      || !self.country.chars().all(|c| c.is_ascii_alphabetic())
    {
      return Err(Error::validation(format!(
        "address.country must be a two-letter code, got {:?}",
        self.country
      )));
    }
    Ok(())
  }
}

/// Optional ways to reach a theater.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contacts {
  pub website:   Option<String>,
  /// Social handle, e.g. `"@teatrooficina"`.
  pub instagram: Option<String>,
  pub phone:     Option<String>,
  pub email:     Option<String>,
}

impl Contacts {
  pub fn validate(&self) -> Result<()> {
    if let Some(site) = &self.website
      && !(site.starts_with("http://") || site.starts_with("https://"))
    {
      return Err(Error::validation(format!(
        "contacts.website must be an http(s) URL, got {site:?}"
      )));
    }
    if let Some(email) = &self.email
      && !email.contains('@')
    {
      return Err(Error::validation(format!(
        "contacts.email is not an address: {email:?}"
      )));
    }
    Ok(())
  }
}

// ─── Theater ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theater {
  pub id:         i64,
  pub name:       String,
  /// Unique, URL-safe; see [`crate::slug`].
  pub slug:       String,
  pub address:    Address,
  pub location:   Option<GeoPoint>,
  pub contacts:   Contacts,
  /// Base64 image or data URL.
  pub photo:      Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── NewTheater ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::CatalogStore::create_theater`].
/// Timestamps and the id are always set by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTheater {
  pub name:     String,
  /// Derived from `name` when absent.
  pub slug:     Option<String>,
  pub address:  Address,
  pub location: Option<GeoPoint>,
  #[serde(default)]
  pub contacts: Contacts,
  pub photo:    Option<String>,
}

impl NewTheater {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("name must not be blank"));
    }
    self.address.validate()?;
    self.contacts.validate()?;
    if let Some(photo) = &self.photo {
      validate_base64_image("photo", photo)?;
    }
    Ok(())
  }

  /// The slug this theater will be stored under.
  pub fn resolved_slug(&self) -> Result<String> {
    match &self.slug {
      Some(slug) => {
        validate_slug(slug)?;
        Ok(slug.clone())
      }
      None => {
        let slug = slugify(&self.name);
        if slug.is_empty() {
          return Err(Error::validation(format!(
            "cannot derive a slug from name {:?}; supply one explicitly",
            self.name
          )));
        }
        Ok(slug)
      }
    }
  }
}

// ─── TheaterPatch ────────────────────────────────────────────────────────────

/// A partial update. Only `Some` fields change; nested objects are replaced
/// wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TheaterPatch {
  pub name:     Option<String>,
  pub slug:     Option<String>,
  pub address:  Option<Address>,
  pub location: Option<GeoPoint>,
  pub contacts: Option<Contacts>,
  pub photo:    Option<String>,
}

impl TheaterPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.slug.is_none()
      && self.address.is_none()
      && self.location.is_none()
      && self.contacts.is_none()
      && self.photo.is_none()
  }

  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(Error::EmptyUpdate);
    }
    if let Some(name) = &self.name
      && name.trim().is_empty()
    {
      return Err(Error::validation("name must not be blank"));
    }
    if let Some(slug) = &self.slug {
      validate_slug(slug)?;
    }
    if let Some(address) = &self.address {
      address.validate()?;
    }
    if let Some(contacts) = &self.contacts {
      contacts.validate()?;
    }
    if let Some(photo) = &self.photo {
      validate_base64_image("photo", photo)?;
    }
    Ok(())
  }

  /// Write the supplied fields into `theater` and refresh `updated_at`.
  pub fn apply_to(self, theater: &mut Theater, now: DateTime<Utc>) {
    if let Some(name) = self.name {
      theater.name = name.trim().to_owned();
    }
    if let Some(slug) = self.slug {
      theater.slug = slug;
    }
    if let Some(address) = self.address {
      theater.address = address;
    }
    if let Some(location) = self.location {
      theater.location = Some(location);
    }
    if let Some(contacts) = self.contacts {
      theater.contacts = contacts;
    }
    if let Some(photo) = self.photo {
      theater.photo = Some(photo);
    }
    theater.updated_at = now;
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

pub const DEFAULT_THEATER_LIMIT: usize = 100;
pub const MAX_PAGE_LIMIT: usize = 200;

/// Parameters for [`crate::store::CatalogStore::list_theaters`].
#[derive(Debug, Clone, Default)]
pub struct TheaterQuery {
  /// Case-insensitive substring of the name.
  pub name:           Option<String>,
  pub city:           Option<String>,
  pub state:          Option<String>,
  pub neighborhood:   Option<String>,
  pub slug:           Option<String>,
  /// Center for proximity search; results are ordered by distance.
  pub near:           Option<GeoPoint>,
  /// Radius around `near`, in metres.
  pub max_distance_m: Option<f64>,
  pub skip:           Option<usize>,
  pub limit:          Option<usize>,
}

impl TheaterQuery {
  pub fn validate(&self) -> Result<()> {
    if let Some(radius) = self.max_distance_m {
      if self.near.is_none() {
        return Err(Error::validation(
          "max_distance_m requires near_lng and near_lat",
        ));
      }
      if !radius.is_finite() || radius < 0.0 {
        return Err(Error::validation("max_distance_m must be a non-negative number"));
      }
    }
    Ok(())
  }

  pub fn skip(&self) -> usize { self.skip.unwrap_or(0) }

  pub fn limit(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_THEATER_LIMIT).clamp(1, MAX_PAGE_LIMIT)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn address() -> Address {
    Address {
      street:       "Praça Ramos de Azevedo".into(),
      number:       None,
      neighborhood: Some("República".into()),
      city:         "São Paulo".into(),
      state:        "SP".into(),
      postal_code:  Some("01037-010".into()),
      country:      "BR".into(),
    }
  }

  fn theater() -> Theater {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Theater {
      id:         7,
      name:       "Theatro Municipal".into(),
      slug:       "theatro-municipal".into(),
      address:    address(),
      location:   None,
      contacts:   Contacts::default(),
      photo:      None,
      created_at: ts,
      updated_at: ts,
    }
  }

  #[test]
  fn slug_is_derived_from_name_when_absent() {
    let input = NewTheater {
      name:     "Teatro Sérgio Cardoso".into(),
      slug:     None,
      address:  address(),
      location: None,
      contacts: Contacts::default(),
      photo:    None,
    };
    assert_eq!(input.resolved_slug().unwrap(), "teatro-sergio-cardoso");
  }

  #[test]
  fn explicit_slug_must_be_canonical() {
    let input = NewTheater {
      name:     "Teatro".into(),
      slug:     Some("Not A Slug".into()),
      address:  address(),
      location: None,
      contacts: Contacts::default(),
      photo:    None,
    };
    assert!(input.resolved_slug().is_err());
  }

  #[test]
  fn country_defaults_to_br() {
    let json = serde_json::json!({
      "street": "Rua Jaceguai", "city": "São Paulo", "state": "SP"
    });
    let addr: Address = serde_json::from_value(json).unwrap();
    assert_eq!(addr.country, "BR");
    assert!(addr.validate().is_ok());
  }

  #[test]
  fn empty_patch_is_rejected() {
    assert!(matches!(TheaterPatch::default().validate(), Err(Error::EmptyUpdate)));
  }

  #[test]
  fn patch_changes_only_supplied_fields() {
    let mut t = theater();
    let before = t.clone();
    let later = before.updated_at + chrono::Duration::minutes(5);

    TheaterPatch { name: Some("Theatro Municipal de SP".into()), ..Default::default() }
      .apply_to(&mut t, later);

    assert_eq!(t.name, "Theatro Municipal de SP");
    assert_eq!(t.slug, before.slug);
    assert_eq!(t.address, before.address);
    assert_eq!(t.created_at, before.created_at);
    assert_eq!(t.updated_at, later);
  }

  #[test]
  fn patched_name_is_trimmed() {
    let mut t = theater();
    let later = t.updated_at;
    TheaterPatch { name: Some("  Teatro Oficina  ".into()), ..Default::default() }
      .apply_to(&mut t, later);
    assert_eq!(t.name, "Teatro Oficina");
  }

  #[test]
  fn radius_without_center_is_invalid() {
    let q = TheaterQuery { max_distance_m: Some(1000.0), ..Default::default() };
    assert!(q.validate().is_err());
  }

  #[test]
  fn limit_is_clamped() {
    let q = TheaterQuery { limit: Some(10_000), ..Default::default() };
    assert_eq!(q.limit(), MAX_PAGE_LIMIT);
    assert_eq!(TheaterQuery::default().limit(), DEFAULT_THEATER_LIMIT);
  }
}
