//! Asset-slot traversal
//!
//! Asset promotion and reference collection are position-based, not
//! value-based: only the fixed set of slots below is ever examined, in a
//! fixed order, so the same document always yields the same slot sequence.
//! The conversion pipeline and the repository's reference walk share this
//! traversal, which is what keeps the persisted asset set equal to the
//! references actually reachable in the manifest.
//!
//! Slot order: `meta.coverImage`; then per slide (in order): the background
//! value when its kind carries binary, the slide thumbnail, the slide's own
//! elements, then each layer's elements, recursing into group children;
//! finally `settings.branding.logo.src` and `settings.defaultBackground`
//! when it is an image.
//!
//! Owned trees cannot alias, so a cyclic group graph shows up here as
//! unbounded nesting; the traversal stops at [`MAX_GROUP_DEPTH`] and reports
//! the offending group instead of recursing further.

use std::collections::BTreeSet;

use crate::element::{Element, KnownElement};
use crate::errors::DomainError;
use crate::hash::{extract_hash, is_reference};
use crate::manifest::{Deck, DeckSettings, Manifest};
use crate::meta::DeckMeta;
use crate::slide::Slide;

/// Maximum group nesting the traversal will follow.
pub const MAX_GROUP_DEPTH: usize = 64;

/// Which position in the document an asset-bearing value sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSlot {
    CoverImage,
    SlideBackground,
    SlideThumbnail,
    ImageSrc,
    MediaSrc,
    BrandingLogo,
    DefaultBackground,
}

impl AssetSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetSlot::CoverImage => "meta.coverImage",
            AssetSlot::SlideBackground => "slide.background.value",
            AssetSlot::SlideThumbnail => "slide.thumbnail",
            AssetSlot::ImageSrc => "element.image.src",
            AssetSlot::MediaSrc => "element.media.src",
            AssetSlot::BrandingLogo => "settings.branding.logo.src",
            AssetSlot::DefaultBackground => "settings.defaultBackground.value",
        }
    }
}

/// A mutable view of one occupied asset slot.
#[derive(Debug)]
pub struct SlotRef<'a> {
    pub slot: AssetSlot,
    pub value: &'a mut String,
}

/// Collect every occupied asset slot of a manifest, in traversal order.
pub fn manifest_asset_slots_mut(
    manifest: &mut Manifest,
) -> Result<Vec<SlotRef<'_>>, DomainError> {
    asset_slots_mut(
        &mut manifest.meta,
        &mut manifest.slides,
        manifest.settings.as_mut(),
    )
}

/// Collect every occupied asset slot of a legacy deck, in traversal order.
pub fn deck_asset_slots_mut(deck: &mut Deck) -> Result<Vec<SlotRef<'_>>, DomainError> {
    asset_slots_mut(&mut deck.meta, &mut deck.slides, deck.settings.as_mut())
}

/// The hash set of every well-formed asset reference reachable from the
/// manifest's asset slots.
pub fn collect_reference_hashes(manifest: &mut Manifest) -> Result<BTreeSet<String>, DomainError> {
    let mut hashes = BTreeSet::new();
    for slot in manifest_asset_slots_mut(manifest)? {
        if is_reference(slot.value) {
            hashes.insert(extract_hash(slot.value)?.to_string());
        }
    }
    Ok(hashes)
}

fn asset_slots_mut<'a>(
    meta: &'a mut DeckMeta,
    slides: &'a mut [Slide],
    settings: Option<&'a mut DeckSettings>,
) -> Result<Vec<SlotRef<'a>>, DomainError> {
    let mut slots = Vec::new();

    if let Some(cover) = meta.cover_image.as_mut() {
        slots.push(SlotRef {
            slot: AssetSlot::CoverImage,
            value: cover,
        });
    }

    for slide in slides {
        if let Some(background) = slide.background.as_mut() {
            if background.carries_binary() {
                if let Some(value) = background.value.as_mut() {
                    slots.push(SlotRef {
                        slot: AssetSlot::SlideBackground,
                        value,
                    });
                }
            }
        }
        if let Some(thumbnail) = slide.thumbnail.as_mut() {
            slots.push(SlotRef {
                slot: AssetSlot::SlideThumbnail,
                value: thumbnail,
            });
        }
        element_slots_mut(&mut slide.elements, 0, &mut slots)?;
        if let Some(layers) = slide.layers.as_mut() {
            for layer in layers {
                element_slots_mut(&mut layer.elements, 0, &mut slots)?;
            }
        }
    }

    if let Some(settings) = settings {
        if let Some(logo) = settings
            .branding
            .as_mut()
            .and_then(|branding| branding.logo.as_mut())
        {
            if let Some(src) = logo.src.as_mut() {
                slots.push(SlotRef {
                    slot: AssetSlot::BrandingLogo,
                    value: src,
                });
            }
        }
        if let Some(background) = settings.default_background.as_mut() {
            if background.kind == "image" {
                if let Some(value) = background.value.as_mut() {
                    slots.push(SlotRef {
                        slot: AssetSlot::DefaultBackground,
                        value,
                    });
                }
            }
        }
    }

    Ok(slots)
}

fn element_slots_mut<'a>(
    elements: &'a mut [Element],
    depth: usize,
    slots: &mut Vec<SlotRef<'a>>,
) -> Result<(), DomainError> {
    for element in elements {
        let Some(known) = element.known_mut() else {
            continue;
        };
        match known {
            KnownElement::Image(image) => {
                if let Some(src) = image.src.as_mut() {
                    slots.push(SlotRef {
                        slot: AssetSlot::ImageSrc,
                        value: src,
                    });
                }
            }
            KnownElement::Media(media) => {
                if let Some(src) = media.src.as_mut() {
                    slots.push(SlotRef {
                        slot: AssetSlot::MediaSrc,
                        value: src,
                    });
                }
            }
            KnownElement::Group(group) => {
                if depth >= MAX_GROUP_DEPTH {
                    return Err(DomainError::CyclicGroup {
                        group_id: group.base.id.clone(),
                    });
                }
                element_slots_mut(&mut group.children, depth + 1, slots)?;
            }
            _ => {}
        }
    }
    Ok(())
}
