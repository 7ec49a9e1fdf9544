//! Inline video preview on card hover.

use tracing::debug;

use crate::error::StorefrontError;

/// A preview video element.
pub trait PreviewVideo {
    /// Seek to `seconds` from the start.
    fn set_current_time(&self, seconds: f64);

    /// Begin playback. Rejections surface here or are dropped by the
    /// implementation; either way nothing is retried.
    fn play(&self) -> Result<(), StorefrontError>;

    /// Pause playback.
    fn pause(&self) -> Result<(), StorefrontError>;
}

/// A product card that may contain a preview video.
pub trait PreviewCard {
    type Video: PreviewVideo;

    /// The card's preview video, if it has one.
    fn preview_video(&self) -> Option<Self::Video>;

    /// Add a class to the card.
    fn add_class(&self, class: &str) -> Result<(), StorefrontError>;

    /// Remove a class from the card.
    fn remove_class(&self, class: &str) -> Result<(), StorefrontError>;
}

/// A card bound to its preview video.
pub struct HoverPreview<C: PreviewCard> {
    card: C,
    video: C::Video,
    playing_class: String,
}

impl<C: PreviewCard> HoverPreview<C> {
    /// Bind a card, or `None` when it has no video.
    pub fn attach(card: C, playing_class: impl Into<String>) -> Option<Self> {
        let video = card.preview_video()?;
        Some(Self {
            card,
            video,
            playing_class: playing_class.into(),
        })
    }

    /// Pointer entered the card: restart the preview.
    pub fn enter(&self) {
        self.video.set_current_time(0.0);
        if let Err(e) = self.video.play() {
            debug!(error = %e, "preview playback rejected");
        }
        if let Err(e) = self.card.add_class(&self.playing_class) {
            debug!(error = %e, "could not mark card as playing");
        }
    }

    /// Pointer left the card: stop the preview.
    pub fn leave(&self) {
        if let Err(e) = self.video.pause() {
            debug!(error = %e, "preview pause failed");
        }
        if let Err(e) = self.card.remove_class(&self.playing_class) {
            debug!(error = %e, "could not unmark card");
        }
    }

    /// The bound card.
    pub fn card(&self) -> &C {
        &self.card
    }
}

/// Binds hover previews to the cards present when the page loads.
#[derive(Debug, Clone)]
pub struct HoverPreviewer {
    playing_class: String,
}

impl HoverPreviewer {
    /// Create a previewer that marks playing cards with `playing_class`.
    pub fn new(playing_class: impl Into<String>) -> Self {
        Self {
            playing_class: playing_class.into(),
        }
    }

    /// Bind every card that has a video. Cards without one are skipped and
    /// get no listeners.
    pub fn bind<C, I>(&self, cards: I) -> Vec<HoverPreview<C>>
    where
        C: PreviewCard,
        I: IntoIterator<Item = C>,
    {
        let mut total = 0usize;
        let bound: Vec<_> = cards
            .into_iter()
            .inspect(|_| total += 1)
            .filter_map(|card| HoverPreview::attach(card, self.playing_class.clone()))
            .collect();

        debug!(cards = total, previews = bound.len(), "hover previews bound");
        bound
    }
}
