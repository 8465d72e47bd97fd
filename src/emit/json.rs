use crate::resolve::{ResolvedClass, ResolvedConfig};
use crate::syntax::Value;
use serde_json::{Map, Number, Value as Json};

/// Key holding the declared parent name of a class object.
pub const PARENT_KEY: &str = "__parent";

fn value_to_json(value: &Value) -> Json {
	match value {
		Value::Int(v) => Json::from(*v),
		// NaN and infinities have no JSON form
		Value::Float(v) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
		Value::Str(v) => Json::String(v.clone()),
		Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
	}
}

fn members(class: &ResolvedClass) -> Map<String, Json> {
	let mut object = Map::new();
	if let Some(parent) = class.parent_name() {
		object.insert(PARENT_KEY.to_string(), Json::String(parent.to_string()));
	}
	for (key, value) in class.fields() {
		object.insert(key.to_string(), value_to_json(value));
	}
	for child in class.classes() {
		object.insert(child.name().to_string(), class_to_json(child));
	}
	object
}

/// A resolved class as a JSON object of its effective fields and nested classes.
pub fn class_to_json(class: &ResolvedClass) -> Json {
	Json::Object(members(class))
}

/// The whole resolved database, top-level classes as keys.
pub fn config_to_json(config: &ResolvedConfig) -> Json {
	Json::Object(members(config.root()))
}
