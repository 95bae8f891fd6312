use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::RoutingError;
use crate::models::driver::GeoPoint;
use crate::models::route::RouteEstimate;
use crate::routing::RouteProvider;

#[derive(Debug, Clone)]
pub struct OrsRouteProvider {
    client: Client,
    endpoint: String,
    profile: String,
    api_key: Option<String>,
}

impl OrsRouteProvider {
    pub fn new(
        endpoint: &str,
        profile: &str,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
            api_key,
        })
    }

    fn directions_url(&self, from: &GeoPoint, to: &GeoPoint) -> Result<Url, RoutingError> {
        let base = format!("{}/v2/directions/{}", self.endpoint, self.profile);
        let mut url = Url::parse(&base)
            .map_err(|err| RoutingError::Malformed(format!("failed to build ORS URL: {err}")))?;

        {
            // ORS expects lng,lat order.
            let mut query = url.query_pairs_mut();
            if let Some(key) = &self.api_key {
                query.append_pair("api_key", key);
            }
            query
                .append_pair("start", &format!("{:.6},{:.6}", from.lng, from.lat))
                .append_pair("end", &format!("{:.6},{:.6}", to.lng, to.lat));
        }

        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrsDirections {
    #[serde(default)]
    features: Vec<OrsFeature>,
}

#[derive(Debug, Deserialize)]
struct OrsFeature {
    properties: OrsProperties,
}

#[derive(Debug, Deserialize)]
struct OrsProperties {
    summary: OrsSummary,
}

// ORS omits both fields when origin and destination coincide.
#[derive(Debug, Deserialize)]
struct OrsSummary {
    #[serde(default)]
    distance: f64, // metres
    #[serde(default)]
    duration: f64, // seconds
}

pub(crate) fn parse_directions(response: OrsDirections) -> Result<RouteEstimate, RoutingError> {
    let summary = response
        .features
        .into_iter()
        .next()
        .map(|feature| feature.properties.summary)
        .ok_or_else(|| RoutingError::Malformed("no route features".to_string()))?;

    Ok(RouteEstimate {
        distance_km: summary.distance / 1000.0,
        duration_minutes: summary.duration / 60.0,
    })
}

#[async_trait]
impl RouteProvider for OrsRouteProvider {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate, RoutingError> {
        let url = self.directions_url(&from, &to)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Status(status.as_u16()));
        }

        let parsed: OrsDirections = response
            .json()
            .await
            .map_err(|err| RoutingError::Malformed(err.to_string()))?;
        parse_directions(parsed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{OrsDirections, OrsRouteProvider, parse_directions};
    use crate::models::driver::GeoPoint;

    #[test]
    fn converts_metres_and_seconds() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "summary": { "distance": 12_340.0, "duration": 900.0 } }
            }]
        });
        let parsed: OrsDirections = serde_json::from_value(body).unwrap();
        let estimate = parse_directions(parsed).unwrap();

        assert!((estimate.distance_km - 12.34).abs() < 1e-9);
        assert!((estimate.duration_minutes - 15.0).abs() < 1e-9);
    }

    #[test]
    fn empty_summary_means_zero_distance() {
        let body = json!({ "features": [{ "properties": { "summary": {} } }] });
        let parsed: OrsDirections = serde_json::from_value(body).unwrap();
        assert_eq!(parse_directions(parsed).unwrap().distance_km, 0.0);
    }

    #[test]
    fn missing_features_is_malformed() {
        let parsed: OrsDirections = serde_json::from_value(json!({ "error": "quota" })).unwrap();
        assert!(parse_directions(parsed).is_err());
    }

    #[test]
    fn url_uses_lng_lat_order() {
        let provider = OrsRouteProvider::new(
            "https://api.openrouteservice.org/",
            "driving-hgv",
            Some("secret".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        let url = provider
            .directions_url(
                &GeoPoint {
                    lat: 35.23,
                    lng: -80.85,
                },
                &GeoPoint {
                    lat: 35.2271,
                    lng: -80.8431,
                },
            )
            .unwrap();

        assert_eq!(url.path(), "/v2/directions/driving-hgv");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("api_key".to_string(), "secret".to_string())));
        assert!(query.contains(&("start".to_string(), "-80.850000,35.230000".to_string())));
        assert!(query.contains(&("end".to_string(), "-80.843100,35.227100".to_string())));
    }
}
