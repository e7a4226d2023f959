use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use super::domain::{
    BloodGroup, Coordinates, DonorCategory, DonorId, DonorRecord, Hospital, OrganOfferRecord,
    OrganType,
};
use super::memory::{InMemoryDonorRepository, InMemoryOrganOfferRepository};
use super::repository::{DonorRepository, HospitalDirectory, OrganOfferRepository, RepositoryError};

/// Donor store backed by a CSV file. Every update rewrites the file.
#[derive(Debug)]
pub struct CsvDonorRepository {
    path: PathBuf,
    cache: InMemoryDonorRepository,
    write_lock: Mutex<()>,
}

impl CsvDonorRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        let records = read_donors(File::open(&path)?)?;
        info!(path = %path.display(), donors = records.len(), "donor dataset loaded");
        Ok(Self {
            path,
            cache: InMemoryDonorRepository::new(records),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `records` to a staging file and renames it over the dataset.
    fn persist(&self, records: &[DonorRecord]) -> Result<(), RepositoryError> {
        let staging = self.path.with_extension("csv.tmp");
        let written = write_donors(&staging, records).and_then(|()| {
            std::fs::rename(&staging, &self.path)?;
            Ok(())
        });
        if written.is_err() {
            let _ = std::fs::remove_file(&staging);
        }
        written?;
        debug!(path = %self.path.display(), "donor dataset persisted");
        Ok(())
    }
}

fn write_donors(path: &Path, records: &[DonorRecord]) -> Result<(), RepositoryError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(DonorRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

impl DonorRepository for CsvDonorRepository {
    fn all(&self) -> Result<Vec<DonorRecord>, RepositoryError> {
        self.cache.all()
    }

    fn fetch(&self, id: &DonorId) -> Result<Option<DonorRecord>, RepositoryError> {
        self.cache.fetch(id)
    }

    /// The cache only changes once the file on disk holds the new record.
    fn update(&self, record: DonorRecord) -> Result<(), RepositoryError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| RepositoryError::Unavailable("writer lock poisoned".to_string()))?;

        let mut snapshot = self.cache.all()?;
        let slot = snapshot
            .iter_mut()
            .find(|existing| existing.donor_id == record.donor_id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record.clone();

        self.persist(&snapshot)?;
        self.cache.update(record)
    }
}

/// Organ offer store loaded once from CSV.
#[derive(Debug)]
pub struct CsvOrganOfferRepository {
    path: PathBuf,
    cache: InMemoryOrganOfferRepository,
}

impl CsvOrganOfferRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        let offers = read_organ_offers(File::open(&path)?)?;
        info!(path = %path.display(), offers = offers.len(), "organ dataset loaded");
        Ok(Self {
            path,
            cache: InMemoryOrganOfferRepository::new(offers),
        })
    }

    /// Reload the offer pool from disk.
    pub fn refresh(&self) -> Result<usize, RepositoryError> {
        let offers = read_organ_offers(File::open(&self.path)?)?;
        let count = offers.len();
        self.cache.replace(offers)?;
        Ok(count)
    }
}

impl OrganOfferRepository for CsvOrganOfferRepository {
    fn all(&self) -> Result<Vec<OrganOfferRecord>, RepositoryError> {
        self.cache.all()
    }
}

#[derive(Debug)]
pub struct CsvHospitalDirectory {
    hospitals: Vec<Hospital>,
}

impl CsvHospitalDirectory {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let hospitals = read_hospitals(File::open(path.as_ref())?)?;
        Ok(Self { hospitals })
    }
}

impl HospitalDirectory for CsvHospitalDirectory {
    fn hospitals(&self) -> Result<Vec<Hospital>, RepositoryError> {
        Ok(self.hospitals.clone())
    }
}

pub fn read_donors<R: Read>(reader: R) -> Result<Vec<DonorRecord>, RepositoryError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<DonorRow>()
        .enumerate()
        .map(|(index, row)| row?.into_record(index + 1))
        .collect()
}

pub fn read_organ_offers<R: Read>(reader: R) -> Result<Vec<OrganOfferRecord>, RepositoryError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<OrganRow>()
        .enumerate()
        .map(|(index, row)| row?.into_record(index + 1))
        .collect()
}

pub fn read_hospitals<R: Read>(reader: R) -> Result<Vec<Hospital>, RepositoryError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut hospitals = Vec::new();
    for (index, row) in csv_reader.deserialize::<HospitalRow>().enumerate() {
        let row = row?;
        let location = finite_coordinates(row.latitude, row.longitude)
            .map_err(|reason| RepositoryError::Malformed { row: index + 1, reason })?;
        hospitals.push(Hospital {
            name: row.name,
            location,
            emergency_contact_number: row.emergency_contact_number,
        });
    }
    Ok(hospitals)
}

#[derive(Debug, Deserialize, Serialize)]
struct DonorRow {
    donor_id: String,
    name: String,
    blood_group: String,
    latitude: f64,
    longitude: f64,
    contact_number: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    months_since_first_donation: u32,
    #[serde(default)]
    number_of_donation: u32,
    #[serde(default)]
    pints_donated: u32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_donation_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing
    )]
    created_at: Option<String>,
}

impl DonorRow {
    fn into_record(self, row: usize) -> Result<DonorRecord, RepositoryError> {
        let malformed = |reason: String| RepositoryError::Malformed { row, reason };

        if self.donor_id.trim().is_empty() {
            return Err(malformed("donor_id is empty".to_string()));
        }
        let location = finite_coordinates(self.latitude, self.longitude).map_err(malformed)?;
        let blood_group: BloodGroup = self
            .blood_group
            .parse()
            .map_err(|err: super::domain::UnknownBloodGroup| malformed(err.to_string()))?;

        // Donors without an explicit last donation fall back to their registration date.
        let last_donation = match self.last_donation_date.or(self.created_at) {
            Some(raw) => Some(
                parse_datetime(&raw)
                    .map(|dt| dt.date_naive())
                    .ok_or_else(|| malformed(format!("unreadable date '{raw}'")))?,
            ),
            None => None,
        };

        Ok(DonorRecord {
            donor_id: DonorId(self.donor_id),
            name: self.name,
            blood_group,
            location,
            contact_number: self.contact_number,
            city: self.city,
            months_since_first_donation: self.months_since_first_donation,
            donation_count: self.number_of_donation,
            volume_donated: self.pints_donated,
            last_donation,
        })
    }
}

impl From<&DonorRecord> for DonorRow {
    fn from(record: &DonorRecord) -> Self {
        Self {
            donor_id: record.donor_id.0.clone(),
            name: record.name.clone(),
            blood_group: record.blood_group.label().to_string(),
            latitude: record.location.latitude,
            longitude: record.location.longitude,
            contact_number: record.contact_number.clone(),
            city: record.city.clone(),
            months_since_first_donation: record.months_since_first_donation,
            number_of_donation: record.donation_count,
            pints_donated: record.volume_donated,
            last_donation_date: record
                .last_donation
                .map(|date| date.format("%Y-%m-%d").to_string()),
            created_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrganRow {
    #[serde(default, alias = "donor_id", deserialize_with = "empty_string_as_none")]
    offer_id: Option<String>,
    name: String,
    #[serde(alias = "organ")]
    organ_available: String,
    #[serde(alias = "donor_category")]
    donor_type: String,
    latitude: f64,
    longitude: f64,
    #[serde(alias = "hospital_contact_number")]
    contact_number: String,
    hla_match_score: f64,
    tissue_size_factor: f64,
    #[serde(alias = "available_at")]
    time_available_utc: String,
}

impl OrganRow {
    fn into_record(self, row: usize) -> Result<OrganOfferRecord, RepositoryError> {
        let malformed = |reason: String| RepositoryError::Malformed { row, reason };

        let donor_category: DonorCategory = self.donor_type.parse().map_err(malformed)?;
        let location = finite_coordinates(self.latitude, self.longitude).map_err(malformed)?;
        let hla_match_score =
            finite("hla_match_score", self.hla_match_score).map_err(malformed)?;
        let tissue_size_factor =
            finite("tissue_size_factor", self.tissue_size_factor).map_err(malformed)?;
        let available_at = parse_datetime(&self.time_available_utc).ok_or_else(|| {
            malformed(format!(
                "unreadable time_available_utc '{}'",
                self.time_available_utc
            ))
        })?;

        Ok(OrganOfferRecord {
            offer_id: self.offer_id.unwrap_or_else(|| format!("organ-{row:04}")),
            name: self.name,
            organ: OrganType::from(self.organ_available),
            donor_category,
            location,
            contact_number: self.contact_number,
            hla_match_score,
            tissue_size_factor,
            available_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HospitalRow {
    name: String,
    latitude: f64,
    longitude: f64,
    emergency_contact_number: String,
}

fn finite(field: &str, value: f64) -> Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{field} must be a finite number (got {value})"))
    }
}

fn finite_coordinates(latitude: f64, longitude: f64) -> Result<Coordinates, String> {
    Ok(Coordinates::new(
        finite("latitude", latitude)?,
        finite("longitude", longitude)?,
    ))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS` (read as UTC) and bare dates.
pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;

    #[test]
    fn parse_datetime_supports_common_layouts() {
        let expected = Utc.with_ymd_and_hms(2025, 9, 24, 10, 0, 0).unwrap();
        assert_eq!(parse_datetime("2025-09-24T10:00:00Z"), Some(expected));
        assert_eq!(parse_datetime("2025-09-24 10:00:00"), Some(expected));
        assert_eq!(
            parse_datetime("2025-09-24"),
            Some(Utc.with_ymd_and_hms(2025, 9, 24, 0, 0, 0).unwrap())
        );
        assert!(parse_datetime("  ").is_none());
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn donor_rows_fall_back_to_created_at() {
        let csv = "donor_id,name,blood_group,latitude,longitude,contact_number,city,months_since_first_donation,number_of_donation,pints_donated,last_donation_date,created_at\n\
d-1,Asha,O-,19.07,72.87,+91100,Mumbai,10,2,2,,2025-05-01 09:30:00\n";
        let donors = read_donors(Cursor::new(csv)).expect("parse");
        assert_eq!(donors.len(), 1);
        assert_eq!(donors[0].blood_group, BloodGroup::ONegative);
        assert_eq!(donors[0].last_donation, NaiveDate::from_ymd_opt(2025, 5, 1));
    }

    #[test]
    fn donor_rows_reject_unknown_blood_groups() {
        let csv = "donor_id,name,blood_group,latitude,longitude,contact_number\n\
d-1,Asha,Q+,19.07,72.87,+91100\n";
        match read_donors(Cursor::new(csv)) {
            Err(RepositoryError::Malformed { row, .. }) => assert_eq!(row, 1),
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn organ_rows_accept_hospital_contact_alias() {
        let csv = "name,organ_available,donor_type,latitude,longitude,hospital_contact_number,hla_match_score,tissue_size_factor,time_available_utc\n\
Ravi,Kidney,Deceased,19.0,73.0,+91200,0.9,0.8,2025-09-24 10:00:00\n";
        let offers = read_organ_offers(Cursor::new(csv)).expect("parse");
        assert_eq!(offers[0].contact_number, "+91200");
        assert_eq!(offers[0].offer_id, "organ-0001");
        assert_eq!(offers[0].organ, OrganType::Kidney);
        assert_eq!(offers[0].donor_category, DonorCategory::Deceased);
    }

    #[test]
    fn organ_rows_reject_non_finite_scores() {
        let csv = "offer_id,name,organ_available,donor_type,latitude,longitude,contact_number,hla_match_score,tissue_size_factor,time_available_utc\n\
K-1,Ravi,Kidney,Deceased,19.0,73.0,+91200,0.9,0.8,2025-09-24 10:00:00\n\
K-2,Meera,Kidney,Deceased,19.0,73.0,+91201,NaN,0.8,2025-09-24 10:00:00\n";
        match read_organ_offers(Cursor::new(csv)) {
            Err(RepositoryError::Malformed { row, reason }) => {
                assert_eq!(row, 2);
                assert!(reason.contains("hla_match_score"), "{reason}");
            }
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn donor_and_hospital_rows_reject_non_finite_coordinates() {
        let donors = "donor_id,name,blood_group,latitude,longitude,contact_number\n\
d-1,Asha,O+,NaN,72.87,+91100\n";
        assert!(matches!(
            read_donors(Cursor::new(donors)),
            Err(RepositoryError::Malformed { row: 1, .. })
        ));

        let hospitals = "name,latitude,longitude,emergency_contact_number\nApollo,19.0,inf,+91300\n";
        assert!(matches!(
            read_hospitals(Cursor::new(hospitals)),
            Err(RepositoryError::Malformed { row: 1, .. })
        ));
    }

    #[test]
    fn non_numeric_coordinates_surface_csv_errors() {
        let csv = "name,latitude,longitude,emergency_contact_number\nApollo,north,73.0,+91300\n";
        assert!(matches!(
            read_hospitals(Cursor::new(csv)),
            Err(RepositoryError::Csv(_))
        ));
    }
}
