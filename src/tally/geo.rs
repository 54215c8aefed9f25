use crate::model::{
    api::geojson::{BureauProperties, Feature, FeatureCollection},
    common::office::Geometry,
    db::office::VotingOffice,
};

/// Project bureaus located by a single point into a GeoJSON feature collection.
///
/// Bureaus with no location, or located by any other geometry, are left out.
/// Coordinates are passed through untouched.
pub fn feature_collection(offices: impl IntoIterator<Item = VotingOffice>) -> FeatureCollection {
    let features = offices
        .into_iter()
        .filter_map(|office| {
            let coordinates = office.location.as_ref()?.as_point()?.clone();
            Some(Feature::new(
                Geometry::Point { coordinates },
                BureauProperties {
                    id: office.id,
                    name: office.name,
                    address: office.address,
                    region: office.region,
                    department: office.department,
                    commune: office.commune,
                    registered_voters: office.registered_voters,
                    contact_name: office.contact_name,
                    contact_phone: office.contact_phone,
                    active: office.active,
                },
            ))
        })
        .collect();
    FeatureCollection::new(features)
}
