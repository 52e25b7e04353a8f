use exemplar_inpaint as ei;

fn main() -> Result<(), ei::Error> {
    let session = ei::Session::builder()
        // the photo with the object we want gone
        .image(&"imgs/photo.jpg")
        // white pixels in the mask mark the object; the mask must match the
        // photo's dimensions
        .mask(&"imgs/object_mask.png")
        // a larger window copies texture more coherently, a smaller one
        // preserves fine detail
        .window(4, 4)
        // 0 estimates the search radius from the hole thickness; pass a
        // negative value to search the whole frame (slow)
        .search_radius(0)
        // grow the mask by one pixel in case it was drawn a little tight
        .dilate(ei::Dilate::Both)
        .build()?;

    let filled = session.run()?;
    println!("filled in {} steps", filled.steps());

    // save the result to the disk
    filled.save("out/photo_fixed.jpg")
}
