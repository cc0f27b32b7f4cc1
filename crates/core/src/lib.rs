//! Two-face tracking and swapping on raw video frames.
//!
//! [`tracking`] keeps two face rectangles alive across frames with as few
//! full-frame detections as possible; [`compositing`] exchanges the two faces
//! with landmark alignment, tone matching and a feathered blend. The face
//! detector and landmark model are injected through the traits in
//! [`detection::domain`].

pub mod shared {
    pub mod clock;
    pub mod constants;
    pub mod frame;
    pub mod geometry;
    pub mod mask;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod face_landmarks;
        pub mod landmark_predictor;
    }
}

pub mod tracking {
    pub mod domain {
        pub mod face_region_tracker;
        pub mod track_state;
    }
    pub mod infrastructure;
}

pub mod compositing {
    pub mod domain {
        pub mod affine_transform;
        pub mod face_compositor;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod pipeline_logger;
    pub mod swap_faces_use_case;
}
