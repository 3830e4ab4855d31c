use crate::error::{SlidecastError, SlidecastResult};

/// Frame-count plan for one slideshow. The per-image still duration is
/// derived so that stills plus transitions plus an optional title card land
/// on the requested total duration; `total_frames` is a hard ceiling the
/// renderer never exceeds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingPlan {
    pub image_duration_secs: f64,
    pub transition_duration_secs: f64,
    pub frames_per_image: u64,
    pub transition_frames: u64,
    pub title_frames: u64,
    pub total_frames: u64,
}

impl TimingPlan {
    /// Build the plan for `num_images` stills. A positive
    /// `video_duration_secs` is a hard target: the per-image duration is
    /// solved as `(V - t*(N-1) - g) / N` and it is fatal when that leaves
    /// no positive time per image. Otherwise each still holds for
    /// `fixed_image_duration_secs` and the total duration follows from it.
    pub fn plan(
        num_images: usize,
        video_duration_secs: f64,
        fixed_image_duration_secs: f64,
        transition_duration_secs: f64,
        title_duration_secs: f64,
        fps: u32,
    ) -> SlidecastResult<TimingPlan> {
        if num_images == 0 {
            return Err(SlidecastError::InsufficientImages { found: 0 });
        }
        if fps == 0 {
            return Err(SlidecastError::invalid_timing("frame rate must be positive"));
        }

        let n = num_images as f64;
        let transitions_total = transition_duration_secs * (n - 1.0);

        let (image_duration, video_duration) = if video_duration_secs > 0.0 {
            let d = (video_duration_secs - transitions_total - title_duration_secs) / n;
            if d <= 0.0 {
                return Err(SlidecastError::invalid_timing(format!(
                    "{num_images} images with {transition_duration_secs}s transitions and a \
                     {title_duration_secs}s title do not fit in {video_duration_secs}s"
                )));
            }
            (d, video_duration_secs)
        } else {
            let d = fixed_image_duration_secs;
            if d <= 0.0 {
                return Err(SlidecastError::invalid_timing(format!(
                    "image duration must be positive, got {d}"
                )));
            }
            (d, n * d + transitions_total + title_duration_secs)
        };

        let fps = f64::from(fps);
        Ok(TimingPlan {
            image_duration_secs: image_duration,
            transition_duration_secs,
            frames_per_image: (image_duration * fps).round() as u64,
            transition_frames: (transition_duration_secs * fps).round() as u64,
            title_frames: (title_duration_secs * fps).round() as u64,
            total_frames: (video_duration * fps).round() as u64,
        })
    }

    /// Global frame index at which rendering for `image_index` begins,
    /// including the transition leading into it. With a title card enabled
    /// every image has a leading transition (the first transitions out of
    /// the title); without one, image 0 starts cold at frame 0.
    pub fn segment_start(&self, image_index: usize, title_enabled: bool) -> u64 {
        let i = image_index as u64;
        if title_enabled {
            self.title_frames + i * (self.transition_frames + self.frames_per_image)
        } else if i == 0 {
            0
        } else {
            self.frames_per_image + (i - 1) * (self.transition_frames + self.frames_per_image)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_divides_remaining_time_evenly() {
        let plan = TimingPlan::plan(4, 20.0, 3.0, 1.0, 0.0, 25).unwrap();
        // (20 - 3*1) / 4 = 4.25s per image.
        assert!((plan.image_duration_secs - 4.25).abs() < 1e-9);
        assert_eq!(plan.frames_per_image, 106);
        assert_eq!(plan.transition_frames, 25);
        assert_eq!(plan.title_frames, 0);
        assert_eq!(plan.total_frames, 500);
    }

    #[test]
    fn fixed_image_duration_derives_the_total() {
        let plan = TimingPlan::plan(4, 0.0, 3.0, 1.0, 2.0, 25).unwrap();
        assert_eq!(plan.frames_per_image, 75);
        // 4*3 + 3*1 + 2 = 17s.
        assert_eq!(plan.total_frames, 425);
        assert_eq!(plan.title_frames, 50);
    }

    #[test]
    fn plan_rejects_overlong_transitions() {
        // 4 transitions of 2s plus a 3s title already exceed 5s.
        let err = TimingPlan::plan(5, 5.0, 3.0, 2.0, 3.0, 25).unwrap_err();
        assert!(matches!(err, SlidecastError::InvalidTiming(_)));
    }

    #[test]
    fn plan_rejects_zero_fps_and_degenerate_durations() {
        assert!(TimingPlan::plan(3, 10.0, 3.0, 0.5, 0.0, 0).is_err());
        // No duration target and no usable per-image duration.
        assert!(TimingPlan::plan(3, 0.0, 0.0, 0.5, 0.0, 25).is_err());
        assert!(TimingPlan::plan(3, -1.0, -2.0, 0.5, 0.0, 25).is_err());
    }

    #[test]
    fn plan_rejects_empty_image_list() {
        assert!(matches!(
            TimingPlan::plan(0, 10.0, 3.0, 0.5, 0.0, 25),
            Err(SlidecastError::InsufficientImages { found: 0 })
        ));
    }

    #[test]
    fn planned_segments_stay_within_one_frame_of_total() {
        for n in [2usize, 3, 5, 9] {
            let plan = TimingPlan::plan(n, 59.0, 3.0, 0.5, 0.0, 25).unwrap();
            let planned =
                plan.frames_per_image * n as u64 + plan.transition_frames * (n as u64 - 1);
            let diff = planned.abs_diff(plan.total_frames);
            assert!(diff <= n as u64, "n={n}: planned {planned} vs total {}", plan.total_frames);
        }
    }

    #[test]
    fn segment_start_accounts_for_title_and_transitions() {
        let plan = TimingPlan::plan(3, 30.0, 3.0, 1.0, 2.0, 10).unwrap();
        assert_eq!(plan.transition_frames, 10);
        assert_eq!(plan.title_frames, 20);

        assert_eq!(plan.segment_start(0, false), 0);
        assert_eq!(plan.segment_start(1, false), plan.frames_per_image);
        assert_eq!(
            plan.segment_start(2, false),
            2 * plan.frames_per_image + plan.transition_frames
        );
        assert_eq!(plan.segment_start(0, true), 20);
        assert_eq!(
            plan.segment_start(1, true),
            20 + plan.transition_frames + plan.frames_per_image
        );
    }
}
