//! Utility module for fetching the optional rescale attributes
//! from a DICOM object.

use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::InMemDicomObject;
use snafu::{ResultExt, Snafu};

use crate::transform::Rescale;

#[derive(Debug, Snafu)]
pub enum GetAttributeError {
    #[snafu(display("Could not read attribute `{}`", name))]
    AccessAttribute {
        name: &'static str,
        source: dicom_object::AccessError,
    },

    #[snafu(display("Could not convert attribute `{}`", name))]
    ConvertValue {
        name: &'static str,
        source: dicom_core::value::ConvertValueError,
    },
}

pub type Result<T, E = GetAttributeError> = std::result::Result<T, E>;

/// Retrieve the RescaleSlope from the DICOM object if it exists.
pub fn rescale_slope(obj: &InMemDicomObject) -> Result<Option<f64>> {
    retrieve_optional_to_f64(obj, tags::RESCALE_SLOPE, "RescaleSlope")
}

/// Retrieve the RescaleIntercept from the DICOM object if it exists.
pub fn rescale_intercept(obj: &InMemDicomObject) -> Result<Option<f64>> {
    retrieve_optional_to_f64(obj, tags::RESCALE_INTERCEPT, "RescaleIntercept")
}

/// Retrieve the modality rescale function of the DICOM object.
///
/// Returns `None` if neither attribute is present.
/// If only one of them is present,
/// the other one takes its default value
/// (slope 1, intercept 0).
pub fn rescale(obj: &InMemDicomObject) -> Result<Option<Rescale>> {
    let slope = rescale_slope(obj)?;
    let intercept = rescale_intercept(obj)?;
    if slope.is_none() && intercept.is_none() {
        return Ok(None);
    }
    let default = Rescale::default();
    Ok(Some(Rescale::new(
        slope.unwrap_or(default.slope),
        intercept.unwrap_or(default.intercept),
    )))
}

#[inline]
fn retrieve_optional_to_f64(
    obj: &InMemDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<Option<f64>> {
    let elem = match obj.element(tag) {
        Ok(e) => e,
        Err(dicom_object::AccessError::NoSuchDataElementTag { .. }) => return Ok(None),
        Err(e) => return Err(e).context(AccessAttributeSnafu { name }),
    };

    elem.to_float64()
        .context(ConvertValueSnafu { name })
        .map(Some)
}
