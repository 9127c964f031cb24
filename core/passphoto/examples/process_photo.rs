//! Turn a portrait into a passport photo using the rustface backend.
//!
//! Usage:
//!   cargo run --example process_photo --features rustface -- \
//!       seeta_fd_frontal_v1.0.bin portrait.jpg passport.jpg

use passphoto::{
    detect_faces, PhotoProcessor, ProcessOptions, ProcessOutcome, ProfileState, RustfaceDetector,
};

fn main() {
    let mut args = std::env::args().skip(1);
    let usage = "usage: process_photo <model.bin> <input> <output.jpg>";
    let model_path = args.next().expect(usage);
    let input_path = args.next().expect(usage);
    let output_path = args.next().expect(usage);

    let detector = RustfaceDetector::from_model_path(&model_path).expect("failed to load model");
    let input = std::fs::read(&input_path).expect("failed to read input");
    let image = image::load_from_memory(&input).expect("failed to decode input");
    let detection = detect_faces(&image, &detector);
    println!("detected {} face(s)", detection.faces.len());

    let processor = PhotoProcessor::new().profile(ProfileState::load("learned_profile.json"));
    let options = ProcessOptions {
        remove_background: true,
        use_learned_profile: true,
    };

    match processor
        .process(&input, &detection, options)
        .expect("processing failed")
    {
        ProcessOutcome::Processed(photo) => {
            println!(
                "head height {:.1}% of frame, valid: {}",
                photo.compliance.head_height_percent * 100.0,
                photo.compliance.valid
            );
            for issue in &photo.compliance.issues {
                println!("  issue: {issue}");
            }
            if photo.background_removed {
                println!("backdrop replaced with white");
            }
            std::fs::write(&output_path, &photo.data).expect("failed to write output");
            println!("wrote {output_path} ({} bytes)", photo.data.len());
        }
        ProcessOutcome::Rejected(report) => {
            println!("rejected: {}", report.error.unwrap_or_default());
        }
    }
}
