use crate::types::Resource;

/// Parse one line of `kubectl api-resources` output.
///
/// Four columns are `NAME APIVERSION NAMESPACED KIND`, five or more are
/// `NAME SHORTNAMES APIVERSION NAMESPACED KIND ...`. Anything shorter is
/// dropped.
pub fn parse_resource_line(line: &str) -> Option<Resource> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.len() {
        4 => Some(Resource {
            name: fields[0].to_string(),
            short_names: None,
            api_version: fields[1].to_string(),
            namespaced: fields[2] == "true",
            kind: fields[3].to_string(),
        }),
        n if n >= 5 => Some(Resource {
            name: fields[0].to_string(),
            short_names: Some(fields[1].to_string()),
            api_version: fields[2].to_string(),
            namespaced: fields[3] == "true",
            kind: fields[4].to_string(),
        }),
        _ => None,
    }
}
