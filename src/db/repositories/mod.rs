mod badges;
mod profiles;
mod sessions;
