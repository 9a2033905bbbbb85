use std::sync::Arc;

use adk_rust::prelude::*;
use anyhow::Result;

use crate::schema::{ProductData, output_schema};
use crate::tools::image::build_image_tool;

pub const PIPELINE_NAME: &str = "MarketingAgent";
pub const PRODUCT_DATA_KEY: &str = "extracted_product_data";
pub const VIDEO_AD_KEY: &str = "video_ad_content";
pub const SOCIAL_POST_KEY: &str = "social_media_post";

pub fn build_product_extractor(model: Arc<dyn Llm>) -> Result<Arc<dyn Agent>> {
    let agent = LlmAgentBuilder::new("ProductExtractorAgent")
        .description("Extracts key product details from the artisan's query.")
        .instruction(
            "You are a product information extraction expert. Your task is to analyze the user's \
             query and identify all relevant details about their product, including its name, \
             craft type, unique selling points, and brand tone.\n\
             Focus solely on extracting factual information from the conversation.\n\n\
             User query: '{user_query}'\n\n\
             Output only in JSON. The JSON must strictly adhere to the ProductData schema: \
             product_name (string), craft_type (string), unique_selling_points (list of \
             strings), brand_tone (string or null).",
        )
        .model(model)
        .output_schema(output_schema::<ProductData>())
        .output_key(PRODUCT_DATA_KEY)
        .build()?;
    Ok(Arc::new(agent))
}

pub fn build_video_ad_agent(model: Arc<dyn Llm>) -> Result<Arc<dyn Agent>> {
    let agent = LlmAgentBuilder::new("VideoAdAgent")
        .description("Generates a video ad script and suggests visuals based on product details.")
        .instruction(
            "You are a creative video marketing specialist. Based on the extracted product \
             details, your task is to:\n\
             1. Write a compelling, short video ad script.\n\
             2. Suggest visual shots or scenes to accompany each part of the script.\n\
             3. Ensure the script and visuals align with the specified brand tone.\n\n\
             Extracted Product Data: {extracted_product_data}\n\n\
             You may call generate_image to attach a reference visual for a key scene.\n\
             Your response should be formatted to be easily understood and used by a video \
             editor.",
        )
        .model(model)
        .tool(build_image_tool())
        .output_key(VIDEO_AD_KEY)
        .build()?;
    Ok(Arc::new(agent))
}

pub fn build_social_media_agent(model: Arc<dyn Llm>) -> Result<Arc<dyn Agent>> {
    let agent = LlmAgentBuilder::new("SocialMediaAgent")
        .description("Generates social media captions and hashtags based on the video content.")
        .instruction(
            "You are a social media copywriter. Your task is to create a catchy Instagram caption \
             and a set of relevant hashtags based on the generated video ad content.\n\n\
             Video Ad Script: {video_ad_content}\n\n\
             The caption should be engaging and the hashtags should help the post reach new \
             audiences.",
        )
        .model(model)
        .output_key(SOCIAL_POST_KEY)
        .build()?;
    Ok(Arc::new(agent))
}

pub fn build_marketing_pipeline(model: Arc<dyn Llm>) -> Result<Arc<dyn Agent>> {
    let stages = vec![
        build_product_extractor(model.clone())?,
        build_video_ad_agent(model.clone())?,
        build_social_media_agent(model)?,
    ];
    Ok(Arc::new(SequentialAgent::new(PIPELINE_NAME, stages)))
}
