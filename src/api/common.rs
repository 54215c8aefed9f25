use rocket::serde::json::{Error as JsonError, Json};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{Error, Result};
use crate::model::{
    common::{CenterId, ElectionId, OfficeId},
    db::{center::VotingCenter, election::Election, office::VotingOffice},
    mongodb::{u32_id_filter, Coll},
};

/// Turn a JSON body into a validated request struct.
///
/// Malformed JSON, wrong types, unknown keys and failed field checks are all
/// reported as validation errors.
pub fn parse_body<T>(body: std::result::Result<Json<T>, JsonError<'_>>) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let body = match body {
        Ok(Json(body)) => body,
        Err(JsonError::Parse(_, err)) => return Err(Error::invalid_field("body", err.to_string())),
        Err(JsonError::Io(err)) => return Err(Error::invalid_field("body", err.to_string())),
    };
    body.validate().map_err(|errors| Error::Validation(errors.into()))?;
    Ok(body)
}

pub async fn get_election(elections: &Coll<Election>, election_id: ElectionId) -> Result<Election> {
    elections
        .find_one(u32_id_filter(election_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))
}

pub async fn get_center(centers: &Coll<VotingCenter>, center_id: CenterId) -> Result<VotingCenter> {
    centers
        .find_one(u32_id_filter(center_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Center with ID '{center_id}'")))
}

pub async fn get_office(offices: &Coll<VotingOffice>, office_id: OfficeId) -> Result<VotingOffice> {
    offices
        .find_one(u32_id_filter(office_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Office with ID '{office_id}'")))
}

/// Fail with a conflict unless the election a child is being attached to exists.
pub async fn require_parent_election(elections: &Coll<Election>, election_id: ElectionId) -> Result<()> {
    match elections.count_documents(u32_id_filter(election_id), None).await? {
        0 => Err(Error::Conflict(format!("No election with ID '{election_id}'"))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json;

    use crate::model::api::election::ElectionSpec;

    #[test]
    fn parse_errors_are_validation_errors() {
        let err = serde_json::from_str::<ElectionSpec>("{\"title\": 3}").unwrap_err();
        let parsed = parse_body::<ElectionSpec>(Err(JsonError::Parse("{\"title\": 3}", err)));
        let Err(Error::Validation(errors)) = parsed else {
            panic!("expected a validation error");
        };
        assert!(errors.into_inner().contains_key("body"));
    }

    #[test]
    fn field_checks_run() {
        let mut spec = ElectionSpec::example();
        spec.title = String::new();
        assert!(matches!(
            parse_body(Ok(Json(spec))),
            Err(Error::Validation(_))
        ));
        assert!(parse_body(Ok(Json(ElectionSpec::example()))).is_ok());
    }
}
