use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form user data attached to roads and lanes, as `code -> value` string pairs. Known keys
/// get typed accessors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub const SIGN_SHAPE: &'static str = "sign_shape";

    pub fn new(map: BTreeMap<String, String>) -> Tags {
        Tags(map)
    }

    pub fn empty() -> Tags {
        Tags(BTreeMap::new())
    }

    pub fn get(&self, k: &str) -> Option<&String> {
        self.0.get(k)
    }

    pub fn contains_key(&self, k: &str) -> bool {
        self.0.contains_key(k)
    }

    pub fn is(&self, k: &str, v: &str) -> bool {
        self.0.get(k).map(|x| x == v).unwrap_or(false)
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, k: K, v: V) {
        self.0.insert(k.into(), v.into());
    }

    pub fn remove(&mut self, k: &str) -> Option<String> {
        self.0.remove(k)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn inner(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn sign_shape(&self) -> Option<SignShape> {
        self.get(Tags::SIGN_SHAPE).and_then(|x| SignShape::parse(x))
    }

    pub fn set_sign_shape(&mut self, shape: SignShape) {
        self.insert(Tags::SIGN_SHAPE, shape.as_str());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignShape {
    Circle,
    Square,
    Triangle,
    Diamond,
    Octagon,
}

impl SignShape {
    pub fn parse(x: &str) -> Option<SignShape> {
        match x {
            "circle" => Some(SignShape::Circle),
            "square" => Some(SignShape::Square),
            "triangle" => Some(SignShape::Triangle),
            "diamond" => Some(SignShape::Diamond),
            "octagon" => Some(SignShape::Octagon),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignShape::Circle => "circle",
            SignShape::Square => "square",
            SignShape::Triangle => "triangle",
            SignShape::Diamond => "diamond",
            SignShape::Octagon => "octagon",
        }
    }
}
