//! Extended part records from the registry's per-part XML API
//!
//! The registry answers `part.cgi?part=<name>` with an `rsbpml` document.
//! Those XML element names are decoded by the private `wire` types and
//! converted into [`ExtendedBiobrick`], whose JSON form is what gets cached
//! and served.

use serde::{Deserialize, Serialize};

/// Full registry record for one part
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtendedBiobrick {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub short_desc: String,
    #[serde(rename = "type")]
    pub full_type: String,
    pub release_status: String,
    pub sample_status: String,
    pub results: String,
    pub nickname: String,
    /// Registry rating, kept as text (frequently empty)
    pub rating: String,
    pub url: String,
    pub entered: String,
    pub author: String,
    pub deep_subparts: Vec<SubPart>,
    pub specified_subparts: Vec<SubPart>,
    pub specified_subscars: Vec<SubPart>,
    pub features: Vec<Feature>,
    pub parameters: Vec<Parameter>,
    pub categories: Vec<String>,
    pub twins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubPart {
    pub id: i64,
    pub name: String,
    pub desc: String,
    #[serde(rename = "type")]
    pub part_type: String,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub feature_type: String,
    pub direction: String,
    pub startpos: i64,
    pub endpos: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub units: String,
    pub url: String,
    pub m_date: String,
    pub user_id: i64,
    pub user_name: String,
}

/// Decode an `rsbpml` document into its parts, in document order.
pub fn parse_rsbpml(xml: &str) -> Result<Vec<ExtendedBiobrick>, quick_xml::DeError> {
    let doc: wire::Rsbpml = quick_xml::de::from_str(xml)?;
    Ok(doc
        .part_list
        .part
        .into_iter()
        .map(ExtendedBiobrick::from)
        .collect())
}

mod wire {
    use serde::{Deserialize, Deserializer};

    /// Registry integers are sometimes blank; those decode as 0
    fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let text = Option::<String>::deserialize(d)?.unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Ok(0);
        }
        text.parse().map_err(serde::de::Error::custom)
    }

    #[derive(Deserialize)]
    pub struct Rsbpml {
        #[serde(default)]
        pub part_list: PartList,
    }

    #[derive(Deserialize, Default)]
    pub struct PartList {
        #[serde(default)]
        pub part: Vec<Part>,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct Part {
        #[serde(deserialize_with = "lenient_int")]
        pub part_id: i64,
        pub part_name: String,
        pub part_short_name: String,
        pub part_short_desc: String,
        pub part_type: String,
        pub release_status: String,
        pub sample_status: String,
        pub part_results: String,
        pub part_nickname: String,
        pub part_rating: String,
        pub part_url: String,
        pub part_entered: String,
        pub part_author: String,
        pub deep_subparts: SubParts,
        pub specified_subparts: SubParts,
        pub specified_subscars: SubScars,
        pub features: Features,
        pub parameters: Parameters,
        pub categories: Categories,
        pub twins: Twins,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct SubPart {
        #[serde(deserialize_with = "lenient_int")]
        pub part_id: i64,
        pub part_name: String,
        pub part_short_desc: String,
        pub part_type: String,
        pub part_nickname: String,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct SubParts {
        pub subpart: Vec<SubPart>,
    }

    /// Subparts and scars interleaved, in document order
    #[derive(Deserialize, Default)]
    pub struct SubScars {
        #[serde(rename = "$value", default)]
        pub items: Vec<SubScar>,
    }

    /// Scars use the same shape as subparts under their own element name
    #[derive(Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SubScar {
        Subpart(SubPart),
        Scar(SubPart),
    }

    impl SubScar {
        pub fn into_inner(self) -> SubPart {
            match self {
                SubScar::Subpart(part) | SubScar::Scar(part) => part,
            }
        }
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct Feature {
        #[serde(deserialize_with = "lenient_int")]
        pub id: i64,
        pub title: String,
        #[serde(rename = "type")]
        pub feature_type: String,
        pub direction: String,
        #[serde(deserialize_with = "lenient_int")]
        pub startpos: i64,
        #[serde(deserialize_with = "lenient_int")]
        pub endpos: i64,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct Features {
        pub feature: Vec<Feature>,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct Parameter {
        #[serde(deserialize_with = "lenient_int")]
        pub id: i64,
        pub name: String,
        pub value: String,
        pub units: String,
        pub url: String,
        pub m_date: String,
        #[serde(deserialize_with = "lenient_int")]
        pub user_id: i64,
        pub user_name: String,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct Parameters {
        pub parameter: Vec<Parameter>,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct Categories {
        pub category: Vec<String>,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub struct Twins {
        pub twin: Vec<String>,
    }
}

impl From<wire::SubPart> for SubPart {
    fn from(s: wire::SubPart) -> Self {
        Self {
            id: s.part_id,
            name: s.part_name,
            desc: s.part_short_desc,
            part_type: s.part_type,
            nickname: s.part_nickname,
        }
    }
}

impl From<wire::Feature> for Feature {
    fn from(f: wire::Feature) -> Self {
        Self {
            id: f.id,
            title: f.title,
            feature_type: f.feature_type,
            direction: f.direction,
            startpos: f.startpos,
            endpos: f.endpos,
        }
    }
}

impl From<wire::Parameter> for Parameter {
    fn from(p: wire::Parameter) -> Self {
        Self {
            id: p.id,
            name: p.name,
            value: p.value,
            units: p.units,
            url: p.url,
            m_date: p.m_date,
            user_id: p.user_id,
            user_name: p.user_name,
        }
    }
}

impl From<wire::Part> for ExtendedBiobrick {
    fn from(p: wire::Part) -> Self {
        let scars = p
            .specified_subscars
            .items
            .into_iter()
            .map(wire::SubScar::into_inner);

        Self {
            id: p.part_id,
            name: p.part_name,
            short_name: p.part_short_name,
            short_desc: p.part_short_desc,
            full_type: p.part_type,
            release_status: p.release_status,
            sample_status: p.sample_status,
            results: p.part_results,
            nickname: p.part_nickname,
            rating: p.part_rating,
            url: p.part_url,
            entered: p.part_entered,
            author: p.part_author,
            deep_subparts: p.deep_subparts.subpart.into_iter().map(Into::into).collect(),
            specified_subparts: p
                .specified_subparts
                .subpart
                .into_iter()
                .map(Into::into)
                .collect(),
            specified_subscars: scars.map(Into::into).collect(),
            features: p.features.feature.into_iter().map(Into::into).collect(),
            parameters: p.parameters.parameter.into_iter().map(Into::into).collect(),
            categories: p.categories.category,
            twins: p.twins.twin,
        }
    }
}
