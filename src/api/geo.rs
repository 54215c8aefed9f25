use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::geojson::FeatureCollection, auth::AuthToken, db::office::VotingOffice,
        mongodb::Coll,
    },
    tally::geo::feature_collection,
};

pub fn routes() -> Vec<Route> {
    routes![get_office_locations]
}

#[get("/geo/offices")]
async fn get_office_locations(
    _token: AuthToken,
    offices: Coll<VotingOffice>,
) -> Result<Json<FeatureCollection>> {
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let offices: Vec<VotingOffice> = offices.find(None, options).await?.try_collect().await?;
    Ok(Json(feature_collection(offices)))
}
