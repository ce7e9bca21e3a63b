//! Minimal subset of the `perftools.profiles` protobuf, enough to emit
//! snapshot profiles that `pprof`-compatible renderers accept.

use prost::Message as _;

use std::collections::HashMap;

#[derive(Clone, PartialEq, prost::Message)]
pub struct Profile {
    #[prost(message, repeated, tag = "1")]
    pub sample_type: Vec<ValueType>,
    #[prost(message, repeated, tag = "2")]
    pub sample: Vec<Sample>,
    #[prost(message, repeated, tag = "4")]
    pub location: Vec<Location>,
    #[prost(message, repeated, tag = "5")]
    pub function: Vec<Function>,
    #[prost(string, repeated, tag = "6")]
    pub string_table: Vec<String>,
    #[prost(int64, tag = "9")]
    pub time_nanos: i64,
    #[prost(message, optional, tag = "11")]
    pub period_type: Option<ValueType>,
    #[prost(int64, tag = "12")]
    pub period: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ValueType {
    #[prost(int64, tag = "1")]
    pub kind: i64,
    #[prost(int64, tag = "2")]
    pub unit: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Sample {
    #[prost(uint64, repeated, tag = "1")]
    pub location_id: Vec<u64>,
    #[prost(int64, repeated, tag = "2")]
    pub value: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Location {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(message, repeated, tag = "4")]
    pub line: Vec<Line>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Line {
    #[prost(uint64, tag = "1")]
    pub function_id: u64,
    #[prost(int64, tag = "2")]
    pub line: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Function {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(int64, tag = "2")]
    pub name: i64,
    #[prost(int64, tag = "3")]
    pub system_name: i64,
}

/// Builds a flat profile: every sample is a single frame.
#[derive(Debug, Default)]
pub struct ProfileBuilder {
    strings: Vec<String>,
    string_index: HashMap<String, i64>,
    frames: HashMap<String, u64>,
    profile: Profile,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        let mut b = Self::default();
        // Index 0 is reserved for the empty string.
        b.intern("");
        b
    }

    pub fn sample_type(mut self, kind: &str, unit: &str) -> Self {
        let vt = ValueType {
            kind: self.intern(kind),
            unit: self.intern(unit),
        };
        if self.profile.period_type.is_none() {
            self.profile.period_type = Some(vt.clone());
            self.profile.period = 1;
        }
        self.profile.sample_type.push(vt);
        self
    }

    /// Adds one sample attributed to a frame named `frame`. `values` lines up
    /// with the sample types declared so far.
    pub fn sample(&mut self, frame: &str, values: Vec<i64>) {
        let location_id = self.frame(frame);
        self.profile.sample.push(Sample {
            location_id: vec![location_id],
            value: values,
        });
    }

    pub fn encode(mut self) -> Vec<u8> {
        self.profile.string_table = self.strings;
        self.profile.time_nanos = time::OffsetDateTime::now_utc()
            .unix_timestamp_nanos()
            .try_into()
            .unwrap_or(i64::MAX);
        self.profile.encode_to_vec()
    }

    fn frame(&mut self, name: &str) -> u64 {
        if let Some(id) = self.frames.get(name) {
            return *id;
        }
        let id = self.frames.len() as u64 + 1;
        let name_idx = self.intern(name);
        self.profile.function.push(Function {
            id,
            name: name_idx,
            system_name: name_idx,
        });
        self.profile.location.push(Location {
            id,
            line: vec![Line {
                function_id: id,
                line: 0,
            }],
        });
        self.frames.insert(name.to_string(), id);
        id
    }

    fn intern(&mut self, s: &str) -> i64 {
        if let Some(idx) = self.string_index.get(s) {
            return *idx;
        }
        let idx = self.strings.len() as i64;
        self.strings.push(s.to_string());
        self.string_index.insert(s.to_string(), idx);
        idx
    }
}
